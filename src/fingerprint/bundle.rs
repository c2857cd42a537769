use std::collections::HashMap;

use super::config::{FingerprintConfig, FingerprintDefaults};
use super::generator::generate_profile;

/// The resolved fingerprint for a single scrape attempt.
#[derive(Debug, Clone, Default)]
pub struct FingerprintBundle {
    pub headers: HashMap<String, String>,
    pub nav_lang: String,
    pub timezone_id: Option<String>,
    pub block_trackers: bool,
    pub block_heavy_resources: bool,
}

impl FingerprintBundle {
    pub fn user_agent(&self) -> &str {
        self.headers
            .get("User-Agent")
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Build a bundle for one attempt, following the field-by-field precedence
/// rules: literal config value > generator output > server default.
pub fn generate(cfg: &FingerprintConfig, defaults: &FingerprintDefaults) -> FingerprintBundle {
    let should_generate = cfg.generate.unwrap_or(defaults.generate);
    if !should_generate {
        return FingerprintBundle::default();
    }

    let generated = generate_profile(&cfg.browsers, &cfg.operating_systems, &cfg.devices);

    let user_agent = match cfg.user_agent.as_deref() {
        Some(ua) if !ua.is_empty() && !ua.eq_ignore_ascii_case("auto") => ua.to_string(),
        _ => {
            if !generated.user_agent.is_empty() {
                generated.user_agent.clone()
            } else {
                defaults
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| generated.user_agent.clone())
            }
        }
    };

    let locale = match cfg.locale.as_deref() {
        Some(l) if !l.is_empty() && !l.eq_ignore_ascii_case("auto") => l.to_string(),
        _ => {
            if !generated.locale.is_empty() {
                generated.locale.clone()
            } else {
                defaults.locale.clone().unwrap_or_default()
            }
        }
    };

    let accept_language = if locale == generated.locale {
        generated.accept_language.clone()
    } else {
        format!("{locale},en;q=0.9")
    };

    let timezone_id = cfg.timezone_id.clone().or_else(|| defaults.timezone_id.clone());

    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), user_agent);
    headers.insert("Accept-Language".to_string(), accept_language);

    FingerprintBundle {
        headers,
        nav_lang: locale,
        timezone_id,
        block_trackers: cfg.block_trackers.unwrap_or(defaults.block_trackers),
        block_heavy_resources: cfg
            .block_heavy_resources
            .unwrap_or(defaults.block_heavy_resources),
    }
}
