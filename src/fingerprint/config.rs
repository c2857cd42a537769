use serde::{Deserialize, Serialize};

/// Per-request fingerprint configuration. Every field is optional; unset
/// fields fall back to server defaults applied by the caller before
/// [`super::generate`] runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintConfig {
    /// `false` short-circuits [`super::generate`] to an empty bundle.
    #[serde(default)]
    pub generate: Option<bool>,
    /// A literal user agent, or the string `"auto"` to keep generator output.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub timezone_id: Option<String>,
    #[serde(default)]
    pub rotate_on_anti_bot: Option<bool>,
    #[serde(default)]
    pub browsers: Vec<String>,
    #[serde(default)]
    pub operating_systems: Vec<String>,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub block_trackers: Option<bool>,
    #[serde(default)]
    pub block_heavy_resources: Option<bool>,
}

/// Server-wide defaults, applied where a [`FingerprintConfig`] field is unset.
#[derive(Debug, Clone)]
pub struct FingerprintDefaults {
    pub user_agent: Option<String>,
    pub locale: Option<String>,
    pub timezone_id: Option<String>,
    pub generate: bool,
    pub rotate_on_anti_bot: bool,
    pub block_trackers: bool,
    pub block_heavy_resources: bool,
}
