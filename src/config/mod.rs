use serde::{Deserialize, Serialize};

const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";
const DEFAULT_TIMEOUT_MS: u32 = 10_000;
const DEFAULT_AUTO_RETRY_DELAY_MS: u32 = 2_000;
/// Automatic retries on the initial load never exceed this.
pub(crate) const MAX_AUTO_RETRIES: u32 = 2;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnvConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Applies to the health probe and to every data request alike.
    pub request_timeout_ms: u32,
    pub auto_retry_limit: u32,
    pub auto_retry_delay_ms: u32,
    pub log_level: log::LevelFilter,
}

impl EnvConfig {
    pub fn new() -> Self {
        // We support BOTH `window.ENV.SUPABASE_URL` (documented in README) and
        // `window.ENV.supabase_url` for compatibility.
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        match env {
            Some(env) => Self::from_lookup(|key| {
                [key.to_string(), key.to_lowercase()].iter().find_map(|k| {
                    js_sys::Reflect::get(&env, &k.as_str().into())
                        .ok()
                        .and_then(|v| v.as_string().or_else(|| v.as_f64().map(|n| n.to_string())))
                })
            }),
            None => Self::from_lookup(|_| None),
        }
    }

    /// Build a config from a key lookup (upper-case key names).
    /// Missing or unparsable values fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: u32| {
            get(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n as u32)
                .unwrap_or(default)
        };

        let supabase_url = get("SUPABASE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_SUPABASE_URL.to_string());

        let request_timeout_ms = match number("REQUEST_TIMEOUT_MS", DEFAULT_TIMEOUT_MS) {
            0 => DEFAULT_TIMEOUT_MS,
            n => n,
        };

        let log_level = get("LOG_LEVEL")
            .and_then(|l| l.trim().parse().ok())
            .unwrap_or(log::LevelFilter::Info);

        Self {
            supabase_url,
            supabase_anon_key: get("SUPABASE_ANON_KEY").unwrap_or_default(),
            request_timeout_ms,
            auto_retry_limit: number("AUTO_RETRY_LIMIT", MAX_AUTO_RETRIES).min(MAX_AUTO_RETRIES),
            auto_retry_delay_ms: number("AUTO_RETRY_DELAY_MS", DEFAULT_AUTO_RETRY_DELAY_MS),
            log_level,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> EnvConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_env_missing() {
        let c = config(&[]);
        assert_eq!(c.supabase_url, DEFAULT_SUPABASE_URL);
        assert_eq!(c.supabase_anon_key, "");
        assert_eq!(c.request_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(c.auto_retry_limit, 2);
        assert_eq!(c.auto_retry_delay_ms, DEFAULT_AUTO_RETRY_DELAY_MS);
        assert_eq!(c.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn test_url_trailing_slash_stripped() {
        let c = config(&[("SUPABASE_URL", " https://abc.supabase.co/ ")]);
        assert_eq!(c.supabase_url, "https://abc.supabase.co");
    }

    #[test]
    fn test_retry_limit_is_clamped() {
        let c = config(&[("AUTO_RETRY_LIMIT", "9")]);
        assert_eq!(c.auto_retry_limit, MAX_AUTO_RETRIES);
        let c = config(&[("AUTO_RETRY_LIMIT", "0")]);
        assert_eq!(c.auto_retry_limit, 0);
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let c = config(&[
            ("REQUEST_TIMEOUT_MS", "soon"),
            ("AUTO_RETRY_DELAY_MS", "-5"),
            ("LOG_LEVEL", "chatty"),
        ]);
        assert_eq!(c.request_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(c.auto_retry_delay_ms, DEFAULT_AUTO_RETRY_DELAY_MS);
        assert_eq!(c.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn test_numeric_values_accept_js_number_text() {
        let c = config(&[("REQUEST_TIMEOUT_MS", "5000"), ("LOG_LEVEL", "debug")]);
        assert_eq!(c.request_timeout_ms, 5000);
        assert_eq!(c.log_level, log::LevelFilter::Debug);
    }
}
