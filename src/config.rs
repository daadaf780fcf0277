use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::orchestrator::{Pacing, RetryPolicy};

/// Run settings, read from the environment (and `.env`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input_csv: PathBuf,
    pub output_csv: PathBuf,
    pub comparison_csv: PathBuf,
    /// `None` disables the database sink
    pub database_url: Option<String>,
    pub request_delay: Duration,
    pub competitor_delay: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    pub render_wait_timeout: Duration,
    pub browser_enabled: bool,
    pub browser_headless: bool,
    /// Competitor pass order
    pub competitors: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |key: &str, default: &str| {
            lookup(key).map_or_else(|| default.to_string(), |v| v.trim().to_string())
        };
        let secs = |key: &str, default: u64| parse(&lookup, key, default).map(Duration::from_secs);

        let max_attempts = parse(&lookup, "MAX_ATTEMPTS", 3_u32)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_ATTEMPTS".to_string(),
                value: "0".to_string(),
            });
        }

        let database_url = string("DATABASE_URL", "sqlite:database/prices.db");

        let competitors: Vec<String> = string("COMPETITORS", "Diamond,Naheed,Metro")
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        if competitors.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "COMPETITORS".to_string(),
                value: String::new(),
            });
        }

        Ok(Self {
            input_csv: string("PRICE_INPUT_CSV", "competitor_links.csv").into(),
            output_csv: string("PRICE_OUTPUT_CSV", "unified_competitor_prices.csv").into(),
            comparison_csv: string("PRICE_COMPARISON_CSV", "competitor_price_comparison.csv").into(),
            database_url: (!database_url.is_empty()).then_some(database_url),
            request_delay: secs("REQUEST_DELAY_SECS", 5)?,
            competitor_delay: secs("COMPETITOR_DELAY_SECS", 10)?,
            max_attempts,
            retry_base_delay: secs("RETRY_BASE_DELAY_SECS", 10)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 30)?,
            render_wait_timeout: secs("RENDER_WAIT_TIMEOUT_SECS", 20)?,
            browser_enabled: parse_bool(&lookup, "BROWSER_ENABLED", true)?,
            browser_headless: parse_bool(&lookup, "BROWSER_HEADLESS", true)?,
            competitors,
        })
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            request_delay: self.request_delay,
            competitor_delay: self.competitor_delay,
            request_timeout: self.request_timeout,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: self.retry_base_delay,
            },
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| invalid(key, &value))
        }
        _ => Ok(default),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, &value)),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.input_csv, PathBuf::from("competitor_links.csv"));
        assert_eq!(config.output_csv, PathBuf::from("unified_competitor_prices.csv"));
        assert_eq!(config.comparison_csv, PathBuf::from("competitor_price_comparison.csv"));
        assert_eq!(config.database_url.as_deref(), Some("sqlite:database/prices.db"));
        assert_eq!(config.competitors, vec!["Diamond", "Naheed", "Metro"]);
        assert!(config.browser_enabled);
        assert!(config.browser_headless);

        let pacing = config.pacing();
        assert_eq!(pacing.request_delay, Duration::from_secs(5));
        assert_eq!(pacing.competitor_delay, Duration::from_secs(10));
        assert_eq!(pacing.request_timeout, Duration::from_secs(30));
        assert_eq!(pacing.retry.max_attempts, 3);
        assert_eq!(pacing.retry.base_delay, Duration::from_secs(10));
        assert_eq!(config.render_wait_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("COMPETITORS", " naheed , Diamond ,"),
            ("DATABASE_URL", ""),
            ("REQUEST_DELAY_SECS", "0"),
            ("MAX_ATTEMPTS", "5"),
            ("BROWSER_HEADLESS", "false"),
        ])
        .unwrap();

        assert_eq!(config.competitors, vec!["naheed", "Diamond"]);
        assert_eq!(config.database_url, None);
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.max_attempts, 5);
        assert!(!config.browser_headless);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            config(&[("REQUEST_TIMEOUT_SECS", "thirty")]).unwrap_err(),
            ConfigError::InvalidValue {
                key: "REQUEST_TIMEOUT_SECS".to_string(),
                value: "thirty".to_string(),
            }
        );
        assert!(config(&[("BROWSER_ENABLED", "maybe")]).is_err());
        assert!(config(&[("MAX_ATTEMPTS", "0")]).is_err());
        assert!(config(&[("COMPETITORS", " , ")]).is_err());
    }
}
