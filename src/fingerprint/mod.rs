//! Fingerprint Advisor: builds per-attempt header/UA/locale/timezone
//! bundles and classifies errors as anti-bot signals worth rotating on.

mod bundle;
mod config;
mod generator;
mod rotate;

pub use bundle::{FingerprintBundle, generate};
pub use config::{FingerprintConfig, FingerprintDefaults};
pub use rotate::{AntiBotSignal, should_rotate};
