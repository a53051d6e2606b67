//! Bot configuration loaded from the environment (`.env` is read by the binary first).
//!
//! Secrets are required; every tuning knob has a default and is clamped to a sane range,
//! so a typo in `.env` degrades to the default instead of refusing to boot.

use std::time::Duration;

use crate::error::{BotError, BotResult};

pub const DEFAULT_TWEETSCOUT_BASE_URL: &str = "https://api.tweetscout.io/v2";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const DEFAULT_MAX_CONCURRENT_JOBS: usize = 100;
const DEFAULT_CACHE_TTL_SECS: u64 = 180;
const DEFAULT_CACHE_SWEEP_THRESHOLD: usize = 200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the bot.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | BOTKEY | (required) | Telegram bot token. |
/// | TW_APIKEY | (required) | TweetScout API key, sent as the `ApiKey` header. |
/// | TWEETSCOUT_BASE_URL | https://api.tweetscout.io/v2 | Upstream scoring API base. |
/// | TELEGRAM_API_BASE | https://api.telegram.org | Bot API base (tests point this at a mock). |
/// | SORSA_MAX_CONCURRENT_JOBS | 100 | Admission ceiling for open aggregation jobs. |
/// | SORSA_CACHE_TTL_SECS | 180 | Report cache time-to-live. |
/// | SORSA_CACHE_SWEEP_THRESHOLD | 200 | Entry count above which expired reports are swept. |
/// | SORSA_REQUEST_TIMEOUT_SECS | 15 | Per-request upstream timeout. |
/// | SORSA_POLL_TIMEOUT_SECS | 30 | `getUpdates` long-poll timeout. |
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub tweetscout_api_key: String,
    pub tweetscout_base_url: String,
    pub telegram_api_base: String,
    pub max_concurrent_jobs: usize,
    pub cache_ttl: Duration,
    pub cache_sweep_threshold: usize,
    pub request_timeout: Duration,
    pub poll_timeout: Duration,
}

impl BotConfig {
    /// Load from process environment.
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            get(name).ok_or_else(|| BotError::Config(format!("{} is not set", name)))
        };

        Ok(Self {
            bot_token: required("BOTKEY")?,
            tweetscout_api_key: required("TW_APIKEY")?,
            tweetscout_base_url: get("TWEETSCOUT_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TWEETSCOUT_BASE_URL.to_string()),
            telegram_api_base: get("TELEGRAM_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            max_concurrent_jobs: parse_or(get("SORSA_MAX_CONCURRENT_JOBS"), DEFAULT_MAX_CONCURRENT_JOBS)
                .max(1),
            cache_ttl: Duration::from_secs(
                parse_or(get("SORSA_CACHE_TTL_SECS"), DEFAULT_CACHE_TTL_SECS).max(1),
            ),
            cache_sweep_threshold: parse_or(
                get("SORSA_CACHE_SWEEP_THRESHOLD"),
                DEFAULT_CACHE_SWEEP_THRESHOLD,
            ),
            request_timeout: Duration::from_secs(
                parse_or(get("SORSA_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS).clamp(1, 120),
            ),
            poll_timeout: Duration::from_secs(
                parse_or(get("SORSA_POLL_TIMEOUT_SECS"), DEFAULT_POLL_TIMEOUT_SECS).min(50),
            ),
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secrets_set() {
        let cfg = BotConfig::from_lookup(lookup(&[("BOTKEY", "123:abc"), ("TW_APIKEY", "k")])).unwrap();
        assert_eq!(cfg.bot_token, "123:abc");
        assert_eq!(cfg.tweetscout_base_url, DEFAULT_TWEETSCOUT_BASE_URL);
        assert_eq!(cfg.max_concurrent_jobs, 100);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(180));
        assert_eq!(cfg.cache_sweep_threshold, 200);
        assert_eq!(cfg.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn missing_secret_is_config_error() {
        let err = BotConfig::from_lookup(lookup(&[("BOTKEY", "123:abc")])).unwrap_err();
        assert!(matches!(err, BotError::Config(ref m) if m.contains("TW_APIKEY")));

        let err = BotConfig::from_lookup(lookup(&[("BOTKEY", "  "), ("TW_APIKEY", "k")])).unwrap_err();
        assert!(matches!(err, BotError::Config(ref m) if m.contains("BOTKEY")));
    }

    #[test]
    fn invalid_numbers_fall_back_and_clamp() {
        let cfg = BotConfig::from_lookup(lookup(&[
            ("BOTKEY", "t"),
            ("TW_APIKEY", "k"),
            ("SORSA_MAX_CONCURRENT_JOBS", "0"),
            ("SORSA_CACHE_TTL_SECS", "soon"),
            ("SORSA_REQUEST_TIMEOUT_SECS", "900"),
            ("TWEETSCOUT_BASE_URL", "http://localhost:9000/"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 1);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(180));
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
        assert_eq!(cfg.tweetscout_base_url, "http://localhost:9000");
    }
}
