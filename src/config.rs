//! Explorer configuration, read from an optional TOML file.

use crate::domain::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub branding: BrandingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_chain_rpc_url")]
    pub chain_rpc_url: String,
    #[serde(default = "default_account_index_url")]
    pub account_index_url: String,
    #[serde(default = "default_price_ticker_url")]
    pub price_ticker_url: String,
    #[serde(default = "default_price_poll_secs")]
    pub price_poll_secs: u64,
}

/// Values shown by the page header.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandingConfig {
    #[serde(default = "default_logo_url")]
    pub logo_url: String,
    #[serde(default = "default_logo_url_1")]
    pub logo_url_1: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            services: ServicesConfig::default(),
            branding: BrandingConfig::default(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            chain_rpc_url: default_chain_rpc_url(),
            account_index_url: default_account_index_url(),
            price_ticker_url: default_price_ticker_url(),
            price_poll_secs: default_price_poll_secs(),
        }
    }
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            logo_url: default_logo_url(),
            logo_url_1: default_logo_url_1(),
            app_name: default_app_name(),
        }
    }
}

impl ExplorerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn price_poll_interval(&self) -> Duration {
        Duration::from_secs(self.services.price_poll_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let services = &self.services;
        for (key, url) in [
            ("services.chain_rpc_url", &services.chain_rpc_url),
            ("services.account_index_url", &services.account_index_url),
            ("services.price_ticker_url", &services.price_ticker_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} must not be empty")));
            }
        }
        if services.price_poll_secs == 0 {
            return Err(ConfigError::Invalid(
                "services.price_poll_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Loads the configuration at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ExplorerConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ExplorerConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::FailedToRead {
        path: path.display().to_string(),
        source,
    })?;
    ExplorerConfig::from_toml_str(&raw)
}

fn default_listen_port() -> u16 {
    3000
}

fn default_chain_rpc_url() -> String {
    "https://eos.greymass.com".to_string()
}

fn default_account_index_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_price_ticker_url() -> String {
    "https://api.coinmarketcap.com/v2/ticker/1765/".to_string()
}

fn default_price_poll_secs() -> u64 {
    60
}

fn default_logo_url() -> String {
    "assets/img/logo.svg".to_string()
}

fn default_logo_url_1() -> String {
    "assets/img/logo-1.svg".to_string()
}

fn default_app_name() -> String {
    "EOS Explorer".to_string()
}
