use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::ai::DEFAULT_MODEL;
use crate::ai::gemini::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use crate::editor::DEFAULT_DEBOUNCE;

const APP_DIR: &str = "cybernotes";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub debounce: Duration,
    pub ai_timeout: Duration,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match var("CYBERNOTES_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?,
        };

        let debounce = var("CYBERNOTES_DEBOUNCE_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE);

        let ai_timeout = var("CYBERNOTES_AI_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Ok(Self {
            data_dir,
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            model: var("CYBERNOTES_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: var("CYBERNOTES_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            debounce,
            ai_timeout,
            log_filter: var("CYBERNOTES_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("cybernotes.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned()).unwrap()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[("CYBERNOTES_DATA_DIR", "/tmp/notes")]);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.model, "gemini-3-flash-preview");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.debounce, Duration::from_millis(500));
        assert_eq!(cfg.ai_timeout, Duration::from_secs(60));
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.log_file(), PathBuf::from("/tmp/notes/cybernotes.log"));
    }

    #[test]
    fn gemini_key_wins_over_generic_key() {
        let cfg = config(&[
            ("CYBERNOTES_DATA_DIR", "/x"),
            ("GEMINI_API_KEY", "g"),
            ("API_KEY", "a"),
        ]);
        assert_eq!(cfg.api_key.as_deref(), Some("g"));

        let cfg = config(&[("CYBERNOTES_DATA_DIR", "/x"), ("API_KEY", "a")]);
        assert_eq!(cfg.api_key.as_deref(), Some("a"));
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let cfg = config(&[
            ("CYBERNOTES_DATA_DIR", "/x"),
            ("CYBERNOTES_DEBOUNCE_MS", "soon"),
            ("CYBERNOTES_AI_TIMEOUT_SECS", "-1"),
        ]);
        assert_eq!(cfg.debounce, DEFAULT_DEBOUNCE);
        assert_eq!(cfg.ai_timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("CYBERNOTES_DATA_DIR", "/x"),
            ("CYBERNOTES_MODEL", "gemini-2.0-flash"),
            ("CYBERNOTES_DEBOUNCE_MS", "250"),
            ("CYBERNOTES_LOG", "cybernotes=debug"),
        ]);
        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert_eq!(cfg.debounce, Duration::from_millis(250));
        assert_eq!(cfg.log_filter, "cybernotes=debug");
    }
}
