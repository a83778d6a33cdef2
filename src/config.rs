// SPDX-License-Identifier: MIT

//! Settings for the flow store client, the auto-save coordinator and the server.
//!
//! Values come from an optional YAML file first, then from the process
//! environment (after `.env` has been loaded by the binary). Environment
//! variables always win over file values.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::{ConfigError, Result};

pub const ENV_BASE_URL: &str = "FLOW_API_BASE_URL";
pub const ENV_USER_ID: &str = "FLOW_USER_ID";
pub const ENV_AUTOSAVE: &str = "FLOW_AUTOSAVE";
pub const ENV_DEBOUNCE_MS: &str = "FLOW_AUTOSAVE_DEBOUNCE_MS";
pub const ENV_PORT: &str = "FLOWSYNC_PORT";

/// Quiet period before an auto-save fires
pub const DEFAULT_DEBOUNCE_MS: u64 = 3000;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the remote flow store, e.g. `http://localhost:8000/api`
    pub api_base_url: Option<String>,
    /// Owning user for flows created by this process
    pub user_id: Option<String>,
    /// Whether auto-save starts enabled
    pub auto_save: bool,
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
    /// Port for `flowsync serve`
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            user_id: None,
            auto_save: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Settings from an optional YAML file, overridden by the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                Self::from_yaml_str(&content)?
            }
            None => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(user) = get(ENV_USER_ID) {
            self.user_id = Some(user);
        }
        if let Some(flag) = get(ENV_AUTOSAVE) {
            self.auto_save = parse_bool(ENV_AUTOSAVE, &flag)?;
        }
        if let Some(ms) = get(ENV_DEBOUNCE_MS) {
            self.debounce_ms = ms
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_DEBOUNCE_MS, &ms))?;
        }
        if let Some(port) = get(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| invalid(ENV_PORT, &port))?;
        }

        Ok(self)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Parse and check a store base URL
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }
        .into()),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value).into()),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.debounce(), Duration::from_secs(3));
        assert!(settings.auto_save);
        assert!(settings.api_base_url.is_none());
    }

    #[test]
    fn test_yaml_with_partial_keys() {
        let yaml = r#"
api_base_url: "http://localhost:8000/api"
debounce_ms: 500
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(
            settings.api_base_url.as_deref(),
            Some("http://localhost:8000/api")
        );
        assert_eq!(settings.debounce_ms, 500);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert!(settings.auto_save);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let settings = Settings::from_yaml_str("user_id: file-user\nauto_save: true\n")
            .unwrap()
            .with_overrides(lookup(&[
                (ENV_USER_ID, "env-user"),
                (ENV_AUTOSAVE, "off"),
                (ENV_DEBOUNCE_MS, "1200"),
            ]))
            .unwrap();

        assert_eq!(settings.user_id.as_deref(), Some("env-user"));
        assert!(!settings.auto_save);
        assert_eq!(settings.debounce(), Duration::from_millis(1200));
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let settings = Settings::default()
            .with_overrides(lookup(&[(ENV_BASE_URL, "  ")]))
            .unwrap();
        assert!(settings.api_base_url.is_none());
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = Settings::default()
            .with_overrides(lookup(&[(ENV_DEBOUNCE_MS, "soon")]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_bool_is_config_error() {
        let err = Settings::default()
            .with_overrides(lookup(&[(ENV_AUTOSAVE, "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_base_url_validation() {
        assert!(parse_base_url("https://flows.example.com/api").is_ok());
        assert!(parse_base_url("not a url").unwrap_err().is_config());
        assert!(parse_base_url("ftp://flows.example.com").unwrap_err().is_config());
    }
}
