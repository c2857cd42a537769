use serde::{Deserialize, Serialize};

use crate::fingerprint::FingerprintConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Static,
    Browser,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Some(Mode::Static),
            "browser" => Some(Mode::Browser),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
    #[serde(default)]
    pub raw_body: Option<bool>,
    #[serde(default)]
    pub fingerprint: Option<FingerprintConfig>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    pub read_time_min: u32,
    pub raw_body: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub body: String,
    pub meta: ScrapeMeta,
}

/// Computes `readTimeMin = ceil(words / 200)`, `0` for an empty body.
pub fn read_time_min(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    if words == 0 {
        0
    } else {
        words.div_ceil(200) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_time_zero_for_empty_body() {
        assert_eq!(read_time_min(""), 0);
        assert_eq!(read_time_min("   "), 0);
    }

    #[test]
    fn read_time_rounds_up() {
        let body = vec!["word"; 201].join(" ");
        assert_eq!(read_time_min(&body), 2);
    }
}
