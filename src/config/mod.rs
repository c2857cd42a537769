//! Server configuration loaded from the environment.
//!
//! All variables are optional and fall back to the defaults documented on
//! each field below. Loading never panics: [`ServerConfig::from_env`] parses
//! raw strings permissively (invalid values fall back to the default) and
//! then runs every cross-field check through [`validate`], which returns the
//! full list of violations rather than failing on the first one.

use std::env;

use crate::scrape::Mode;

mod violation;
pub use violation::Violation;

/// Typed, validated server configuration.
///
/// Constructed only via [`ServerConfig::from_env`] or [`validate`]; both
/// paths run the same invariant checks, so a `ServerConfig` in hand is
/// always known-good.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub base_path: String,

    pub default_mode: Mode,
    pub default_task_timeout_secs: u64,

    pub default_fingerprint_user_agent: Option<String>,
    pub default_fingerprint_locale: Option<String>,
    pub default_fingerprint_timezone_id: Option<String>,
    pub default_fingerprint_generate: bool,
    pub default_fingerprint_rotate_on_anti_bot: bool,
    pub default_block_trackers: bool,
    pub default_block_heavy_resources: bool,

    pub playwright_headless: bool,
    pub playwright_navigation_timeout_secs: u64,

    pub max_concurrency: usize,
    pub max_queue: usize,
    pub max_browser_concurrency: usize,
    pub max_browser_queue: usize,

    /// Server-wide batch worker concurrency. Resolves the Open Question on
    /// `BatchCommonSettings.concurrency`: this is a server setting, not a
    /// per-batch override.
    pub default_batch_concurrency: usize,
    pub default_batch_min_delay_ms: u64,
    pub default_batch_max_delay_ms: u64,

    pub data_lifetime_mins: u64,
    pub cleanup_interval_mins: u64,

    pub webhook_timeout_ms: u64,
    pub default_webhook_backoff_ms: u64,
    pub default_webhook_max_attempts: u32,

    pub app_close_timeout_ms: u64,

    /// Maximum accepted page body size before a scrape fails with
    /// `ResponseTooLarge`. Not independently env-configurable in the
    /// source documentation; kept as a fixed, generous cap.
    pub max_response_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8080,
            base_path: String::new(),

            default_mode: Mode::Static,
            default_task_timeout_secs: 30,

            default_fingerprint_user_agent: None,
            default_fingerprint_locale: None,
            default_fingerprint_timezone_id: None,
            default_fingerprint_generate: true,
            default_fingerprint_rotate_on_anti_bot: true,
            default_block_trackers: true,
            default_block_heavy_resources: false,

            playwright_headless: true,
            playwright_navigation_timeout_secs: 30,

            max_concurrency: 10,
            max_queue: 50,
            max_browser_concurrency: 4,
            max_browser_queue: 20,

            default_batch_concurrency: 2,
            default_batch_min_delay_ms: 0,
            default_batch_max_delay_ms: 0,

            data_lifetime_mins: 60,
            cleanup_interval_mins: 10,

            webhook_timeout_ms: 10_000,
            default_webhook_backoff_ms: 500,
            default_webhook_max_attempts: 5,

            app_close_timeout_ms: 10_000,

            max_response_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment, applying defaults for anything
    /// unset or unparsable, then validate the result.
    pub fn from_env() -> Result<Self, Vec<Violation>> {
        let d = Self::default();

        let cfg = Self {
            listen_host: env_string("LISTEN_HOST", d.listen_host),
            listen_port: env_parsed("LISTEN_PORT", d.listen_port),
            base_path: env_string("BASE_PATH", d.base_path),

            default_mode: env::var("DEFAULT_MODE")
                .ok()
                .and_then(|s| Mode::parse(&s))
                .unwrap_or(d.default_mode),
            default_task_timeout_secs: env_parsed(
                "DEFAULT_TASK_TIMEOUT_SECS",
                d.default_task_timeout_secs,
            ),

            default_fingerprint_user_agent: env::var("DEFAULT_FINGERPRINT_USER_AGENT").ok(),
            default_fingerprint_locale: env::var("DEFAULT_FINGERPRINT_LOCALE").ok(),
            default_fingerprint_timezone_id: env::var("DEFAULT_FINGERPRINT_TIMEZONE_ID").ok(),
            default_fingerprint_generate: env_bool(
                "DEFAULT_FINGERPRINT_GENERATE",
                d.default_fingerprint_generate,
            ),
            default_fingerprint_rotate_on_anti_bot: env_bool(
                "DEFAULT_FINGERPRINT_ROTATE_ON_ANTI_BOT",
                d.default_fingerprint_rotate_on_anti_bot,
            ),
            default_block_trackers: env_bool(
                "DEFAULT_PLAYWRIGHT_BLOCK_TRACKERS",
                d.default_block_trackers,
            ),
            default_block_heavy_resources: env_bool(
                "DEFAULT_PLAYWRIGHT_BLOCK_HEAVY_RESOURCES",
                d.default_block_heavy_resources,
            ),

            playwright_headless: env_bool("PLAYWRIGHT_HEADLESS", d.playwright_headless),
            playwright_navigation_timeout_secs: env_parsed(
                "PLAYWRIGHT_NAVIGATION_TIMEOUT_SECS",
                d.playwright_navigation_timeout_secs,
            ),

            max_concurrency: env_parsed("MAX_CONCURRENCY", d.max_concurrency),
            max_queue: env_parsed("MAX_QUEUE", d.max_queue),
            max_browser_concurrency: env_parsed(
                "MAX_BROWSER_CONCURRENCY",
                d.max_browser_concurrency,
            ),
            max_browser_queue: env_parsed("MAX_BROWSER_QUEUE", d.max_browser_queue),

            default_batch_concurrency: env_parsed(
                "DEFAULT_BATCH_CONCURRENCY",
                d.default_batch_concurrency,
            ),
            default_batch_min_delay_ms: env_parsed(
                "DEFAULT_BATCH_MIN_DELAY_MS",
                d.default_batch_min_delay_ms,
            ),
            default_batch_max_delay_ms: env_parsed(
                "DEFAULT_BATCH_MAX_DELAY_MS",
                d.default_batch_max_delay_ms,
            ),

            data_lifetime_mins: env_parsed("DATA_LIFETIME_MINS", d.data_lifetime_mins),
            cleanup_interval_mins: env_parsed(
                "CLEANUP_INTERVAL_MINS",
                d.cleanup_interval_mins,
            ),

            webhook_timeout_ms: env_parsed("WEBHOOK_TIMEOUT_MS", d.webhook_timeout_ms),
            default_webhook_backoff_ms: env_parsed(
                "DEFAULT_WEBHOOK_BACKOFF_MS",
                d.default_webhook_backoff_ms,
            ),
            default_webhook_max_attempts: env_parsed(
                "DEFAULT_WEBHOOK_MAX_ATTEMPTS",
                d.default_webhook_max_attempts,
            ),

            app_close_timeout_ms: env_parsed("APP_CLOSE_TIMEOUT_MS", d.app_close_timeout_ms),

            max_response_body_bytes: d.max_response_body_bytes,
        };

        validate(cfg)
    }
}

/// Pure validator: checks cross-field invariants and returns every
/// violation found rather than stopping at the first one.
pub fn validate(cfg: ServerConfig) -> Result<ServerConfig, Vec<Violation>> {
    let mut violations = Vec::new();

    if cfg.listen_port == 0 {
        violations.push(Violation::new("LISTEN_PORT", "must be nonzero"));
    }
    if cfg.default_task_timeout_secs == 0 {
        violations.push(Violation::new(
            "DEFAULT_TASK_TIMEOUT_SECS",
            "must be at least 1",
        ));
    }
    if cfg.max_concurrency == 0 {
        violations.push(Violation::new("MAX_CONCURRENCY", "must be at least 1"));
    }
    if cfg.max_browser_concurrency == 0 {
        violations.push(Violation::new(
            "MAX_BROWSER_CONCURRENCY",
            "must be at least 1",
        ));
    }
    if cfg.default_batch_concurrency == 0 {
        violations.push(Violation::new(
            "DEFAULT_BATCH_CONCURRENCY",
            "must be at least 1",
        ));
    }
    if cfg.default_batch_min_delay_ms > cfg.default_batch_max_delay_ms {
        violations.push(Violation::new(
            "DEFAULT_BATCH_MIN_DELAY_MS",
            "must be <= DEFAULT_BATCH_MAX_DELAY_MS",
        ));
    }
    if cfg.default_webhook_max_attempts == 0 {
        violations.push(Violation::new(
            "DEFAULT_WEBHOOK_MAX_ATTEMPTS",
            "must be at least 1",
        ));
    }
    if cfg.data_lifetime_mins == 0 {
        violations.push(Violation::new("DATA_LIFETIME_MINS", "must be at least 1"));
    }
    if cfg.cleanup_interval_mins == 0 {
        violations.push(Violation::new(
            "CLEANUP_INTERVAL_MINS",
            "must be at least 1",
        ));
    }
    if !cfg.base_path.is_empty() && !cfg.base_path.starts_with('/') {
        violations.push(Violation::new("BASE_PATH", "must start with '/' if set"));
    }

    if violations.is_empty() {
        Ok(cfg)
    } else {
        Err(violations)
    }
}

fn env_string(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(s) => match s.to_ascii_lowercase().as_str() {
            "false" | "0" | "no" => false,
            "true" | "1" | "yes" => true,
            _ => default,
        },
        Err(_) => default,
    }
}
