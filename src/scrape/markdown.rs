//! HTML -> Markdown conversion, called as a pure function.

/// Converts `html` to Markdown. Falls back to the stripped text content on
/// conversion failure rather than failing the whole scrape over a
/// formatting concern.
pub fn html_to_markdown(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "markdown conversion failed, falling back to plain text");
            strip_tags(html)
        }
    }
}

fn strip_tags(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_basic_markup() {
        let md = html_to_markdown("<h1>Title</h1><p>Hello <strong>world</strong></p>");
        assert!(md.contains("Title"));
        assert!(md.contains("world"));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(html_to_markdown(""), "");
    }
}
