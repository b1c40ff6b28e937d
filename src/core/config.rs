use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchange_rate_api: Option<ExchangeRateApiConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchange_rate_api: Some(ExchangeRateApiConfig {
                base_url: "https://api.exchangerate-api.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FlagsConfig {
    pub base_url: String,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        FlagsConfig {
            base_url: "https://flagcdn.com".to_string(),
        }
    }
}

/// Initial values of the converter session.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DefaultsConfig {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub dark_mode: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            amount: 1.0,
            from: "USD".to_string(),
            to: "EUR".to_string(),
            dark_mode: false,
        }
    }
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub flags: FlagsConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: default_base_currency(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            providers: ProvidersConfig::default(),
            flags: FlagsConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, falling back to built-in
    /// defaults when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxconv", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn rate_api_base_url(&self) -> &str {
        self.providers
            .exchange_rate_api
            .as_ref()
            .map_or("https://api.exchangerate-api.com", |p| p.base_url.as_str())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Time limit for one fetch, never longer than the refresh interval.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1)).min(self.refresh_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: "EUR"
refresh_interval_secs: 60
request_timeout_secs: 10
providers:
  exchange_rate_api:
    base_url: "http://example.com/rates"
flags:
  base_url: "http://example.com/flags"
defaults:
  amount: 25.5
  from: "GBP"
  to: "JPY"
  dark_mode: true
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.rate_api_base_url(), "http://example.com/rates");
        assert_eq!(config.flags.base_url, "http://example.com/flags");
        assert_eq!(config.defaults.amount, 25.5);
        assert_eq!(config.defaults.from, "GBP");
        assert_eq!(config.defaults.to, "JPY");
        assert!(config.defaults.dark_mode);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("defaults:\n  to: CHF\n").unwrap();
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.rate_api_base_url(),
            "https://api.exchangerate-api.com"
        );
        assert_eq!(config.flags.base_url, "https://flagcdn.com");
        assert_eq!(config.defaults.amount, 1.0);
        assert_eq!(config.defaults.from, "USD");
        assert_eq!(config.defaults.to, "CHF");
        assert!(!config.defaults.dark_mode);

        let config: AppConfig = serde_yaml::from_str("providers: {}\n").unwrap();
        assert!(config.providers.exchange_rate_api.is_none());
        assert_eq!(
            config.rate_api_base_url(),
            "https://api.exchangerate-api.com"
        );
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = AppConfig::load_from_path(dir.path().join("nope.yaml"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_request_timeout_capped_by_interval() {
        let config: AppConfig =
            serde_yaml::from_str("refresh_interval_secs: 5\nrequest_timeout_secs: 60\n").unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }
}
