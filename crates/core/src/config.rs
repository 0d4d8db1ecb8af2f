//! Hub configuration.
//!
//! Resolved with the following precedence (highest first):
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! The config file is taken from an explicit path, else `VALUTA_CONFIG`,
//! else `<data_dir>/config.toml` when it exists.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

pub const ENV_API_KEY: &str = "EXCHANGERATE_API_KEY";
pub const ENV_CONFIG: &str = "VALUTA_CONFIG";
pub const ENV_DATA_DIR: &str = "VALUTA_DATA_DIR";
pub const ENV_RATES_TTL: &str = "VALUTA_RATES_TTL";
pub const ENV_MAX_RETRIES: &str = "VALUTA_MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "VALUTA_RETRY_DELAY";
pub const ENV_REQUEST_TIMEOUT: &str = "VALUTA_REQUEST_TIMEOUT";

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
pub const DEFAULT_EXCHANGERATE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Everything the hub needs to know about sources, timing and files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub base_currency: String,
    pub fiat_currencies: Vec<String>,
    pub crypto_currencies: Vec<String>,
    /// Upper-case crypto code → CoinGecko coin id.
    pub crypto_id_map: BTreeMap<String, String>,

    pub coingecko_url: String,
    pub exchangerate_url: String,
    pub exchangerate_api_key: Option<String>,

    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub rates_ttl_seconds: u64,
    pub update_interval_secs: u64,

    pub data_dir: PathBuf,
    pub rates_file: String,
    pub history_file: String,
    pub users_file: String,
    pub portfolios_file: String,
    pub session_file: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        let crypto_id_map = [("BTC", "bitcoin"), ("ETH", "ethereum"), ("SOL", "solana")]
            .into_iter()
            .map(|(code, id)| (code.to_string(), id.to_string()))
            .collect();
        Self {
            base_currency: "USD".into(),
            fiat_currencies: ["EUR", "GBP", "RUB", "JPY", "CNY"]
                .map(String::from)
                .to_vec(),
            crypto_currencies: ["BTC", "ETH", "SOL"].map(String::from).to_vec(),
            crypto_id_map,
            coingecko_url: DEFAULT_COINGECKO_URL.into(),
            exchangerate_url: DEFAULT_EXCHANGERATE_URL.into(),
            exchangerate_api_key: None,
            request_timeout_secs: 10,
            max_retries: 3,
            retry_delay_secs: 2,
            rates_ttl_seconds: 3600,
            update_interval_secs: 300,
            data_dir: PathBuf::from("data"),
            rates_file: "rates.json".into(),
            history_file: "exchange_rates.json".into(),
            users_file: "users.json".into(),
            portfolios_file: "portfolios.json".into(),
            session_file: "session.json".into(),
        }
    }
}

impl HubConfig {
    /// Load file + environment, then validate.
    ///
    /// `explicit` is the `--config` path; when it is given it must exist.
    pub fn load(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match explicit {
            Some(path) if !path.exists() => {
                return Err(CoreError::Config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            Some(path) => Self::load_from(path)?,
            None => match std::env::var(ENV_CONFIG) {
                Ok(path) => Self::load_from(Path::new(&path))?,
                Err(_) => {
                    let dir = data_dir
                        .map(Path::to_path_buf)
                        .or_else(|| std::env::var(ENV_DATA_DIR).ok().map(PathBuf::from))
                        .unwrap_or_else(|| Self::default().data_dir);
                    Self::load_from(&dir.join("config.toml"))?
                }
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.exchangerate_api_key = Some(key.trim().to_string());
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(v) = lookup(ENV_RATES_TTL) {
            self.rates_ttl_seconds = parse_env(ENV_RATES_TTL, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = parse_env(ENV_MAX_RETRIES, &v)?;
        }
        if let Some(v) = lookup(ENV_RETRY_DELAY) {
            self.retry_delay_secs = parse_env(ENV_RETRY_DELAY, &v)?;
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = parse_env(ENV_REQUEST_TIMEOUT, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.base_currency.trim().is_empty() {
            return Err(CoreError::Config("base_currency must not be empty".into()));
        }
        if self.max_retries == 0 {
            return Err(CoreError::Config("max_retries must be at least 1".into()));
        }
        if self.rates_ttl_seconds == 0 {
            return Err(CoreError::Config(
                "rates_ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.update_interval_secs == 0 {
            return Err(CoreError::Config(
                "update_interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Upper-cased base currency.
    pub fn base(&self) -> String {
        self.base_currency.trim().to_uppercase()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    // ── File locations ──────────────────────────────────────────────

    pub fn rates_path(&self) -> PathBuf {
        self.data_dir.join(&self.rates_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(&self.users_file)
    }

    pub fn portfolios_path(&self) -> PathBuf {
        self.data_dir.join(&self.portfolios_file)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(&self.session_file)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value.trim().parse().map_err(|_| {
        CoreError::Config(format!("{name} must be a non-negative integer, got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = HubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base(), "USD");
        assert_eq!(config.crypto_id_map.get("BTC").unwrap(), "bitcoin");
        assert_eq!(config.rates_path(), PathBuf::from("data/rates.json"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = HubConfig::load_from(Path::new("/nonexistent/valuta/config.toml")).unwrap();
        assert_eq!(config, HubConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rates_ttl_seconds = 60\nmax_retries = 5").unwrap();
        let config = HubConfig::load_from(file.path()).unwrap();
        assert_eq!(config.rates_ttl_seconds, 60);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay_secs, 2);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml {{{{").unwrap();
        match HubConfig::load_from(file.path()).unwrap_err() {
            CoreError::Config(msg) => assert!(msg.contains("Invalid config file")),
            other => panic!("Expected Config, got: {other:?}"),
        }
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = HubConfig::default();
        config
            .apply_env(env(&[
                (ENV_API_KEY, " secret "),
                (ENV_RATES_TTL, "120"),
                (ENV_RETRY_DELAY, "0"),
            ]))
            .unwrap();
        assert_eq!(config.exchangerate_api_key.as_deref(), Some("secret"));
        assert_eq!(config.rates_ttl_seconds, 120);
        assert_eq!(config.retry_delay_secs, 0);
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let mut config = HubConfig::default();
        let err = config
            .apply_env(env(&[(ENV_MAX_RETRIES, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_RETRIES));
    }

    #[test]
    fn validate_rejects_zero_retries_and_ttl() {
        let mut config = HubConfig {
            max_retries: 0,
            ..HubConfig::default()
        };
        assert!(config.validate().is_err());
        config.max_retries = 1;
        config.rates_ttl_seconds = 0;
        assert!(config.validate().is_err());
        config.rates_ttl_seconds = 1;
        config.base_currency = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_update_interval() {
        let config = HubConfig {
            update_interval_secs: 0,
            ..HubConfig::default()
        };
        match config.validate() {
            Err(CoreError::Config(msg)) => assert!(msg.contains("update_interval_secs")),
            other => panic!("Expected Config error, got: {other:?}"),
        }
    }
}
