//! Application configuration.
//!
//! Configuration is loaded from `CARDAPIO_*` environment variables with
//! fallback to defaults.

use std::env;
use std::path::PathBuf;

use cardapio_core::pricing::{PriceBasis, PricingSettings, RoundingRule};
use serde::{Deserialize, Serialize};

use crate::pool::DbConfig;

/// Runtime configuration of the pricing back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size (default: 5)
    pub max_connections: u32,

    /// Markup used for the main suggested price (default: weighted)
    pub price_basis: PriceBasis,

    /// Rounding applied to suggested prices (default: none)
    pub rounding_rule: RoundingRule,

    /// Default tracing filter when RUST_LOG is unset (default: info)
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("./data/cardapio.db"),
            max_connections: 5,
            price_basis: PriceBasis::Weighted,
            rounding_rule: RoundingRule::None,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, test maps).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let config = AppConfig {
            database_path: lookup("CARDAPIO_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: match lookup("CARDAPIO_MAX_CONNECTIONS") {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("CARDAPIO_MAX_CONNECTIONS".to_string()))?,
                None => defaults.max_connections,
            },

            price_basis: match lookup("CARDAPIO_PRICE_BASIS") {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("CARDAPIO_PRICE_BASIS".to_string()))?,
                None => defaults.price_basis,
            },

            rounding_rule: match lookup("CARDAPIO_ROUNDING_RULE") {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("CARDAPIO_ROUNDING_RULE".to_string()))?,
                None => defaults.rounding_rule,
            },

            log_filter: lookup("CARDAPIO_LOG").unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("CARDAPIO_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Pricing settings handed to the service.
    pub fn pricing_settings(&self) -> PricingSettings {
        PricingSettings {
            basis: self.price_basis,
            rounding: self.rounding_rule,
        }
    }

    /// Database configuration for the pool.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database_path, PathBuf::from("./data/cardapio.db"));
        assert_eq!(config.pricing_settings(), PricingSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CARDAPIO_DATABASE_PATH", "/tmp/menu.db"),
            ("CARDAPIO_MAX_CONNECTIONS", "3"),
            ("CARDAPIO_PRICE_BASIS", "delivery"),
            ("CARDAPIO_ROUNDING_RULE", "cents_90"),
            ("CARDAPIO_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.price_basis, PriceBasis::Delivery);
        assert_eq!(config.rounding_rule, RoundingRule::Cents90);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.db_config().max_connections, 3);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("CARDAPIO_MAX_CONNECTIONS", "many"),
            ("CARDAPIO_MAX_CONNECTIONS", "0"),
            ("CARDAPIO_PRICE_BASIS", "retail"),
            ("CARDAPIO_ROUNDING_RULE", "up"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid value for {}", key));
        }
    }
}
