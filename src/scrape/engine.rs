//! Scrape Engine: orchestrates admission, fingerprinting, extraction, and
//! anti-bot retry for a single scrape request.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::admission::Pool;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::fingerprint::{self, AntiBotSignal, FingerprintConfig, FingerprintDefaults};

use super::browser_driver::{BrowserDriver, PageOptions};
use super::extractor::{self, ArticleExtractor};
use super::markdown::html_to_markdown;
use super::ssrf;
use super::types::{Mode, ScrapeMeta, ScrapeRequest, ScrapeResult, read_time_min};

const MAX_RETRIES: u32 = 3;

pub struct Engine {
    generic_pool: Arc<Pool>,
    browser_pool: Arc<Pool>,
    extractor: ArticleExtractor,
    browser_driver: Arc<dyn BrowserDriver>,
    fingerprint_defaults: FingerprintDefaults,
    default_mode: Mode,
    default_task_timeout_secs: u64,
    navigation_timeout: Duration,
    max_response_body_bytes: usize,
}

impl Engine {
    pub fn new(
        config: &ServerConfig,
        generic_pool: Arc<Pool>,
        browser_pool: Arc<Pool>,
        browser_driver: Arc<dyn BrowserDriver>,
    ) -> Self {
        Self {
            generic_pool,
            browser_pool,
            extractor: ArticleExtractor::new(),
            browser_driver,
            fingerprint_defaults: FingerprintDefaults {
                user_agent: config.default_fingerprint_user_agent.clone(),
                locale: config.default_fingerprint_locale.clone(),
                timezone_id: config.default_fingerprint_timezone_id.clone(),
                generate: config.default_fingerprint_generate,
                rotate_on_anti_bot: config.default_fingerprint_rotate_on_anti_bot,
                block_trackers: config.default_block_trackers,
                block_heavy_resources: config.default_block_heavy_resources,
            },
            default_mode: config.default_mode,
            default_task_timeout_secs: config.default_task_timeout_secs,
            navigation_timeout: Duration::from_secs(config.playwright_navigation_timeout_secs),
            max_response_body_bytes: config.max_response_body_bytes,
        }
    }

    pub async fn scrape(
        self: Arc<Self>,
        req: ScrapeRequest,
        ctx: &CancellationToken,
    ) -> Result<ScrapeResult, AppError> {
        let url = ssrf::validate(&req.url).map_err(|v| AppError::Validation(v.0))?;
        let mode = req.mode.unwrap_or(self.default_mode);
        let task_timeout =
            Duration::from_secs(req.task_timeout_secs.unwrap_or(self.default_task_timeout_secs));
        let raw_body = req.raw_body.unwrap_or(false);
        let fp_cfg = req.fingerprint.clone().unwrap_or_default();

        let pool = match mode {
            Mode::Browser => &self.browser_pool,
            Mode::Static => &self.generic_pool,
        };

        // `run` spawns this onto its own task, so it must be owned and
        // `'static`: a cancelled caller must be able to stop waiting without
        // the work itself being torn down mid-flight.
        let engine = self.clone();
        let ctx_owned = ctx.clone();
        let admitted = pool
            .run(ctx, async move {
                tokio::time::timeout(
                    task_timeout,
                    engine.execute(url.as_str(), mode, &fp_cfg, raw_body, &ctx_owned),
                )
                .await
            })
            .await?;

        match admitted {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout("scrape exceeded task timeout".to_string())),
        }
    }

    async fn execute(
        &self,
        url: &str,
        mode: Mode,
        fp_cfg: &FingerprintConfig,
        raw_body: bool,
        ctx: &CancellationToken,
    ) -> Result<ScrapeResult, AppError> {
        let article = match mode {
            Mode::Static => {
                let bundle = fingerprint::generate(fp_cfg, &self.fingerprint_defaults);
                self.extractor
                    .from_url(url, &bundle.headers, self.navigation_timeout, self.max_response_body_bytes)
                    .await?
            }
            Mode::Browser => self.scrape_browser(url, fp_cfg, ctx).await?,
        };

        let body = if raw_body {
            article.content_html.clone()
        } else {
            html_to_markdown(&article.content_html)
        };

        Ok(ScrapeResult {
            url: url.to_string(),
            title: article.title,
            description: article.description,
            date: article.date,
            author: article.author,
            meta: ScrapeMeta {
                lang: article.lang,
                read_time_min: read_time_min(&body),
                raw_body,
            },
            body,
        })
    }

    async fn scrape_browser(
        &self,
        url: &str,
        fp_cfg: &FingerprintConfig,
        ctx: &CancellationToken,
    ) -> Result<extractor::ExtractedArticle, AppError> {
        let mut last_err: Option<AppError> = None;

        for attempt in 0..MAX_RETRIES {
            if ctx.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let bundle = fingerprint::generate(fp_cfg, &self.fingerprint_defaults);
            let opts = PageOptions {
                timezone_id: bundle.timezone_id.as_deref(),
                locale: &bundle.nav_lang,
                navigation_timeout: self.navigation_timeout,
                max_body_bytes: self.max_response_body_bytes,
            };

            let outcome = self.browser_driver.render(&bundle, opts, url).await;

            match outcome {
                Ok(html) => match extractor::from_html(&html, url) {
                    Ok(article) => return Ok(article),
                    Err(err) => {
                        let rotate = should_rotate_for(&err, fp_cfg, &self.fingerprint_defaults);
                        last_err = Some(err);
                        if !rotate || attempt + 1 >= MAX_RETRIES {
                            break;
                        }
                    }
                },
                Err(err) => {
                    let rotate = should_rotate_for(&err, fp_cfg, &self.fingerprint_defaults);
                    last_err = Some(err);
                    if !rotate || attempt + 1 >= MAX_RETRIES {
                        break;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::Browser("exhausted retries".to_string())))
    }
}

fn should_rotate_for(
    err: &AppError,
    fp_cfg: &FingerprintConfig,
    defaults: &FingerprintDefaults,
) -> bool {
    let status_code = match err {
        AppError::Browser(msg) => extract_status_code(msg),
        _ => None,
    };
    let signal = AntiBotSignal {
        message: &err.to_string(),
        status_code,
    };
    fingerprint::should_rotate(&signal, fp_cfg, defaults)
}

fn extract_status_code(message: &str) -> Option<u16> {
    message
        .split_whitespace()
        .find_map(|tok| tok.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok())
        .filter(|code| (100..600).contains(code))
}
