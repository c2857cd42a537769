//! `BrowserDriver`: isolated-page capability consumed by the scrape engine.
//!
//! The trait keeps chromiumoxide entirely behind a narrow seam, the same way
//! the crawl engine isolates Chrome behind its own `Crawler` trait — tests
//! exercise an in-memory fake, never a real browser.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;

use crate::error::AppError;
use crate::fingerprint::FingerprintBundle;

/// Per-call navigation options derived from the fingerprint bundle.
pub struct PageOptions<'a> {
    pub timezone_id: Option<&'a str>,
    pub locale: &'a str,
    pub navigation_timeout: Duration,
    pub max_body_bytes: usize,
}

/// Acquires an isolated page, navigates to `url`, and returns the rendered
/// HTML. The page is always torn down before returning, on every path.
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn render(
        &self,
        bundle: &FingerprintBundle,
        opts: PageOptions<'_>,
        url: &str,
    ) -> Result<String, AppError>;
}

/// Production implementation backed by the pre-warmed `browser_pool`.
pub struct ChromiumDriver {
    pool: Arc<crate::browser_pool::BrowserPool>,
}

impl ChromiumDriver {
    pub fn new(pool: Arc<crate::browser_pool::BrowserPool>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn render(
        &self,
        bundle: &FingerprintBundle,
        opts: PageOptions<'_>,
        url: &str,
    ) -> Result<String, AppError> {
        let nav = async {
            let guard = self
                .pool
                .acquire()
                .await
                .map_err(|e| AppError::Browser(format!("failed to acquire browser: {e}")))?;

            let page = guard
                .browser()
                .new_page("about:blank")
                .await
                .map_err(|e| AppError::Browser(format!("failed to open page: {e}")))?;

            if !bundle.user_agent().is_empty() {
                let _ = page
                    .execute(
                        SetUserAgentOverrideParams::builder()
                            .user_agent(bundle.user_agent().to_string())
                            .accept_language(opts.locale.to_string())
                            .build()
                            .expect("user_agent is always set"),
                    )
                    .await;
            }

            if let Some(tz) = opts.timezone_id
                && !tz.is_empty()
            {
                let _ = page
                    .execute(SetTimezoneOverrideParams::new(tz.to_string()))
                    .await;
            }

            page.execute(NavigateParams::new(url))
                .await
                .map_err(|e| AppError::Browser(format!("navigation failed: {e}")))?;

            page.wait_for_navigation()
                .await
                .map_err(|e| AppError::Browser(format!("navigation failed: {e}")))?;

            let html = page
                .content()
                .await
                .map_err(|e| AppError::Browser(format!("failed to read page content: {e}")))?;

            if html.len() > opts.max_body_bytes {
                return Err(AppError::ResponseTooLarge);
            }

            // `page` and `guard` drop here: page closes, browser returns to pool.
            Ok(html)
        };

        match tokio::time::timeout(opts.navigation_timeout, nav).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout("browser navigation timed out".to_string())),
        }
    }
}

/// In-memory fake for tests: returns pre-programmed HTML (or an error)
/// without touching a real browser.
pub struct FakeBrowserDriver {
    pub html: Result<String, AppError>,
}

impl FakeBrowserDriver {
    pub fn ok(html: impl Into<String>) -> Self {
        Self { html: Ok(html.into()) }
    }
}

#[async_trait::async_trait]
impl BrowserDriver for FakeBrowserDriver {
    async fn render(
        &self,
        _bundle: &FingerprintBundle,
        _opts: PageOptions<'_>,
        _url: &str,
    ) -> Result<String, AppError> {
        match &self.html {
            Ok(html) => Ok(html.clone()),
            Err(e) => Err(clone_err(e)),
        }
    }
}

fn clone_err(e: &AppError) -> AppError {
    match e {
        AppError::Validation(s) => AppError::Validation(s.clone()),
        AppError::NotFound(s) => AppError::NotFound(s.clone()),
        AppError::Overloaded => AppError::Overloaded,
        AppError::Draining => AppError::Draining,
        AppError::Timeout(s) => AppError::Timeout(s.clone()),
        AppError::Browser(s) => AppError::Browser(s.clone()),
        AppError::ContentExtraction(s) => AppError::ContentExtraction(s.clone()),
        AppError::ResponseTooLarge => AppError::ResponseTooLarge,
        AppError::Cancelled => AppError::Cancelled,
        AppError::Internal(s) => AppError::Internal(s.clone()),
    }
}
