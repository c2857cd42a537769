//! A small, self-contained realistic-fingerprint generator.
//!
//! Picks from a constrained option set the same way `browser_profile`
//! constrains Chrome profile directories to a single naming scheme — no
//! external fingerprint database, just enough variety to avoid a single
//! static User-Agent fingerprinting the service itself.

use rand::seq::IndexedRandom;

pub struct GeneratedProfile {
    pub user_agent: String,
    pub locale: String,
    pub accept_language: String,
}

struct BrowserProfile {
    name: &'static str,
    os: &'static str,
    device: &'static str,
    user_agent: &'static str,
}

const PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        name: "chrome",
        os: "windows",
        device: "desktop",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    },
    BrowserProfile {
        name: "chrome",
        os: "macos",
        device: "desktop",
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    },
    BrowserProfile {
        name: "chrome",
        os: "linux",
        device: "desktop",
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    },
    BrowserProfile {
        name: "firefox",
        os: "windows",
        device: "desktop",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    },
    BrowserProfile {
        name: "firefox",
        os: "linux",
        device: "desktop",
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    },
    BrowserProfile {
        name: "safari",
        os: "macos",
        device: "desktop",
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    },
    BrowserProfile {
        name: "chrome",
        os: "android",
        device: "mobile",
        user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
    },
    BrowserProfile {
        name: "safari",
        os: "ios",
        device: "mobile",
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    },
];

const LOCALES: &[&str] = &["en-US", "en-GB", "de-DE", "fr-FR", "es-ES", "pt-BR"];

/// Pick a profile compatible with the (possibly empty) browser/OS/device
/// filters. Unknown filter values are silently ignored rather than causing
/// an empty candidate set; at least one candidate is always returned.
pub fn generate_profile(
    browsers: &[String],
    operating_systems: &[String],
    devices: &[String],
) -> GeneratedProfile {
    let mut candidates: Vec<&BrowserProfile> = PROFILES
        .iter()
        .filter(|p| {
            let browser_ok = browsers.is_empty()
                || browsers.iter().any(|b| b.eq_ignore_ascii_case(p.name));
            let os_ok = operating_systems.is_empty()
                || operating_systems.iter().any(|o| o.eq_ignore_ascii_case(p.os));
            let device_ok =
                devices.is_empty() || devices.iter().any(|d| d.eq_ignore_ascii_case(p.device));
            browser_ok && os_ok && device_ok
        })
        .collect();

    if candidates.is_empty() {
        // Filters named nothing we recognize; fall back to the full table
        // rather than failing the request.
        candidates = PROFILES.iter().collect();
    }

    let mut rng = rand::rng();
    let profile = candidates.choose(&mut rng).expect("PROFILES is non-empty");
    let locale = *LOCALES.choose(&mut rng).expect("LOCALES is non-empty");

    GeneratedProfile {
        user_agent: profile.user_agent.to_string(),
        locale: locale.to_string(),
        accept_language: format!("{locale},en;q=0.9"),
    }
}
