//! Article/content parsing: `ArticleExtractor.fromUrl` and `.fromHtml`.
//!
//! Fetches (static mode) or parses already-rendered HTML (browser mode) and
//! pulls out title/description/date/author/lang plus the main content HTML.
//! Deliberately lenient: a page with no recognizable article metadata still
//! extracts successfully with empty fields rather than failing the request.

use std::collections::HashMap;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::AppError;

#[derive(Debug, Clone, Default)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub content_html: String,
    pub lang: Option<String>,
}

pub struct ArticleExtractor {
    client: reqwest::Client,
}

impl ArticleExtractor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("reqwest client builder with static config never fails"),
        }
    }

    pub async fn from_url(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Result<ExtractedArticle, AppError> {
        let mut req = self.client.get(url).timeout(timeout);
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = req.send().await.map_err(|e| classify_reqwest_error(&e))?;

        if !resp.status().is_success() {
            return Err(AppError::Browser(format!(
                "upstream returned status {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if bytes.len() > max_body_bytes {
            return Err(AppError::ResponseTooLarge);
        }

        let html = String::from_utf8_lossy(&bytes).into_owned();
        from_html(&html, url)
    }
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(err.to_string())
    } else {
        AppError::Browser(err.to_string())
    }
}

/// Parse already-fetched/rendered HTML into an [`ExtractedArticle`].
pub fn from_html(html: &str, _url: &str) -> Result<ExtractedArticle, AppError> {
    if html.trim().is_empty() {
        return Err(AppError::ContentExtraction(
            "received empty document".to_string(),
        ));
    }

    let document = Html::parse_document(html);

    let title = first_text(&document, "title")
        .or_else(|| meta_content(&document, "og:title"))
        .filter(|s| !s.is_empty());

    let description = meta_content(&document, "description")
        .or_else(|| meta_content(&document, "og:description"))
        .filter(|s| !s.is_empty());

    let date = meta_content(&document, "article:published_time")
        .or_else(|| attr(&document, "time[datetime]", "datetime"));

    let author = meta_content(&document, "author");

    let lang = attr(&document, "html", "lang");

    let content_html = extract_main_content(&document);

    Ok(ExtractedArticle {
        title,
        description,
        date,
        author,
        content_html,
        lang,
    })
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
}

fn meta_content(document: &Html, name_or_property: &str) -> Option<String> {
    let sel = Selector::parse("meta").ok()?;
    document.select(&sel).find_map(|el| {
        let matches = el.value().attr("name") == Some(name_or_property)
            || el.value().attr("property") == Some(name_or_property);
        if matches {
            el.value().attr("content").map(|s| s.trim().to_string())
        } else {
            None
        }
    })
}

fn attr(document: &Html, selector: &str, attr_name: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr_name))
        .map(|s| s.to_string())
}

/// Prefer `<article>`, fall back to `<main>`, then `<body>`.
fn extract_main_content(document: &Html) -> String {
    for selector in ["article", "main", "body"] {
        if let Ok(sel) = Selector::parse(selector)
            && let Some(el) = document.select(&sel).next()
        {
            let html = el.html();
            if !html.trim().is_empty() {
                return html;
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_fails_extraction() {
        assert!(from_html("", "http://x/a").is_err());
    }

    #[test]
    fn extracts_title_and_description() {
        let html = r#"<html lang="en"><head><title>Hi</title>
            <meta name="description" content="desc"></head>
            <body><article>content</article></body></html>"#;
        let article = from_html(html, "http://x/a").unwrap();
        assert_eq!(article.title.as_deref(), Some("Hi"));
        assert_eq!(article.description.as_deref(), Some("desc"));
        assert_eq!(article.lang.as_deref(), Some("en"));
        assert!(article.content_html.contains("content"));
    }

    #[test]
    fn page_with_no_metadata_still_succeeds() {
        let html = "<html><body></body></html>";
        let article = from_html(html, "http://x/a").unwrap();
        assert_eq!(article.title, None);
    }
}
