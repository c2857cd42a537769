use super::config::{FingerprintConfig, FingerprintDefaults};

/// Anti-bot classifier input: the scrape failure that triggered a possible
/// rotation. Modeled after the teacher's `FailureKind::classify`, which
/// case-insensitively substring-matches an error's message.
pub struct AntiBotSignal<'a> {
    pub message: &'a str,
    pub status_code: Option<u16>,
}

const ANTI_BOT_PHRASES: &[&str] = &[
    "captcha",
    "bot detection",
    "access denied",
    "forbidden",
    "rate limit",
    "security check",
    "cloudflare",
    "recaptcha",
];

/// Whether the scrape engine should discard the current fingerprint and
/// retry with a freshly generated one.
pub fn should_rotate(
    signal: &AntiBotSignal<'_>,
    cfg: &FingerprintConfig,
    defaults: &FingerprintDefaults,
) -> bool {
    if !cfg.rotate_on_anti_bot.unwrap_or(defaults.rotate_on_anti_bot) {
        return false;
    }

    if matches!(signal.status_code, Some(403) | Some(429)) {
        return true;
    }

    let lower = signal.message.to_ascii_lowercase();
    ANTI_BOT_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> FingerprintDefaults {
        FingerprintDefaults {
            user_agent: None,
            locale: None,
            timezone_id: None,
            generate: true,
            rotate_on_anti_bot: true,
            block_trackers: true,
            block_heavy_resources: false,
        }
    }

    #[test]
    fn disabled_rotation_always_false() {
        let cfg = FingerprintConfig {
            rotate_on_anti_bot: Some(false),
            ..Default::default()
        };
        let signal = AntiBotSignal {
            message: "Cloudflare security check",
            status_code: Some(403),
        };
        assert!(!should_rotate(&signal, &cfg, &defaults()));
    }

    #[test]
    fn status_403_triggers_rotation() {
        let signal = AntiBotSignal {
            message: "unexpected response",
            status_code: Some(403),
        };
        assert!(should_rotate(&signal, &FingerprintConfig::default(), &defaults()));
    }

    #[test]
    fn status_429_triggers_rotation() {
        let signal = AntiBotSignal {
            message: "unexpected response",
            status_code: Some(429),
        };
        assert!(should_rotate(&signal, &FingerprintConfig::default(), &defaults()));
    }

    #[test]
    fn phrase_match_is_case_insensitive() {
        let signal = AntiBotSignal {
            message: "Please complete the CAPTCHA to continue",
            status_code: None,
        };
        assert!(should_rotate(&signal, &FingerprintConfig::default(), &defaults()));
    }

    #[test]
    fn unrelated_error_does_not_rotate() {
        let signal = AntiBotSignal {
            message: "connection reset by peer",
            status_code: Some(500),
        };
        assert!(!should_rotate(&signal, &FingerprintConfig::default(), &defaults()));
    }
}
