use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{keys, LocalStorage};

pub const DEFAULT_RECENT_COUNT: usize = 5;

/// User preferences, stored alongside the application data so a reset
/// returns them to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    pub color_output: bool,
    /// Disables tables and decorations in favour of plain lines.
    pub plain_mode: bool,
    pub recent_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            color_output: true,
            plain_mode: false,
            recent_count: DEFAULT_RECENT_COUNT,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown setting `{0}`")]
    UnknownKey(String),
    #[error("Invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl Config {
    pub const KEYS: [&'static str; 5] = ["locale", "currency", "color", "plain", "recent"];

    /// Applies a `settings set <key> <value>` style edit.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = value.trim();
        match key {
            "locale" => {
                if trimmed.is_empty() {
                    return Err(invalid("must not be empty"));
                }
                self.locale = trimmed.to_string();
            }
            "currency" => {
                if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(invalid("expected a three-letter currency code"));
                }
                self.currency = trimmed.to_ascii_uppercase();
            }
            "color" => {
                self.color_output = parse_flag(trimmed).ok_or_else(|| invalid("expected on or off"))?
            }
            "plain" => {
                self.plain_mode = parse_flag(trimmed).ok_or_else(|| invalid("expected on or off"))?
            }
            "recent" => {
                self.recent_count = trimmed
                    .parse::<usize>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| invalid("expected a positive number"))?;
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("locale", self.locale.clone()),
            ("currency", self.currency.clone()),
            ("color", on_off(self.color_output).into()),
            ("plain", on_off(self.plain_mode).into()),
            ("recent", self.recent_count.to_string()),
        ]
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Loads and saves [`Config`] through the key-value adapter.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    storage: LocalStorage,
}

impl ConfigManager {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Config {
        self.storage
            .get(keys::USER_PREFERENCES)
            .unwrap_or_default()
    }

    pub fn save(&self, config: &Config) {
        self.storage.set(keys::USER_PREFERENCES, config);
    }

    pub fn reset(&self) -> Config {
        self.storage.remove(keys::USER_PREFERENCES);
        Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn load_falls_back_to_defaults_and_round_trips_saves() {
        let manager = ConfigManager::new(LocalStorage::new(MemoryBackend::new()));
        assert_eq!(manager.load(), Config::default());
        let mut config = manager.load();
        config.set("currency", "eur").unwrap();
        config.set("recent", "8").unwrap();
        manager.save(&config);
        let loaded = manager.load();
        assert_eq!(loaded.currency, "EUR");
        assert_eq!(loaded.recent_count, 8);
        assert_eq!(manager.reset(), Config::default());
        assert_eq!(manager.load(), Config::default());
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert_eq!(
            config.set("theme", "dark"),
            Err(ConfigError::UnknownKey("theme".into()))
        );
        assert!(config.set("recent", "0").is_err());
        assert!(config.set("color", "maybe").is_err());
        config.set("plain", "on").unwrap();
        assert!(config.plain_mode);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: Config = serde_json::from_str(r#"{"currency":"ARS"}"#).unwrap();
        assert_eq!(config.currency, "ARS");
        assert_eq!(config.recent_count, DEFAULT_RECENT_COUNT);
    }
}
