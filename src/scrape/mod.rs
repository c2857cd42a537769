//! Scrape Engine: mode dispatch, fingerprint application, anti-bot retry,
//! and post-processing (Markdown conversion, derived metadata).

pub mod browser_driver;
mod engine;
mod extractor;
mod markdown;
mod ssrf;
mod types;

pub use browser_driver::{BrowserDriver, ChromiumDriver, FakeBrowserDriver, PageOptions};
pub use engine::Engine;
pub use extractor::ArticleExtractor;
pub use markdown::html_to_markdown;
pub use ssrf::{SsrfViolation, validate as validate_url};
pub use types::{Mode, ScrapeMeta, ScrapeRequest, ScrapeResult, read_time_min};
