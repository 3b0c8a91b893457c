//! Client configuration.

use kin_types::{Address, Asset, Network};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default fee per operation, in stroops.
pub const DEFAULT_BASE_FEE: u32 = 100;

/// Invalid or incomplete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Ledger stream behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// First delay before resubscribing after a stream failure.
    pub reconnect_delay_ms: u64,
    /// Cap for the doubling reconnect delay.
    pub max_reconnect_delay_ms: u64,
    /// Poll interval for account creation listeners.
    pub creation_poll_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 500,
            max_reconnect_delay_ms: 30_000,
            creation_poll_interval_ms: 1_000,
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn creation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.creation_poll_interval_ms)
    }
}

/// Connection, network and asset settings for a [`crate::KinClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Horizon-style HTTP endpoint.
    pub horizon_url: String,
    /// Network passphrase; transactions are signed for this network.
    pub network_passphrase: String,
    /// Code of the tracked asset.
    pub asset_code: String,
    /// Issuer of the tracked asset (StrKey `G…`).
    pub asset_issuer: String,
    /// Fee per operation, in stroops.
    pub base_fee: u32,
    /// TCP connect timeout for HTTP requests.
    pub connect_timeout_ms: u64,
    pub stream: StreamConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            horizon_url: "http://localhost:8000".to_string(),
            network_passphrase: "Kin Testnet ; December 2018".to_string(),
            asset_code: "KIN".to_string(),
            asset_issuer: String::new(),
            base_fee: DEFAULT_BASE_FEE,
            connect_timeout_ms: 10_000,
            stream: StreamConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KIN_HORIZON_URL`: Horizon base URL
    /// - `KIN_NETWORK_PASSPHRASE`: Network passphrase
    /// - `KIN_ASSET_CODE`: Asset code (default: KIN)
    /// - `KIN_ASSET_ISSUER`: Asset issuer address
    /// - `KIN_BASE_FEE`: Fee per operation in stroops (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = env::var("KIN_HORIZON_URL") {
            config.horizon_url = url;
        }
        if let Ok(passphrase) = env::var("KIN_NETWORK_PASSPHRASE") {
            config.network_passphrase = passphrase;
        }
        if let Ok(code) = env::var("KIN_ASSET_CODE") {
            config.asset_code = code;
        }
        if let Ok(issuer) = env::var("KIN_ASSET_ISSUER") {
            config.asset_issuer = issuer;
        }
        if let Ok(fee) = env::var("KIN_BASE_FEE") {
            config.base_fee = fee
                .parse()
                .map_err(|_| ConfigError::invalid("base_fee", format!("not a number: {fee}")))?;
        }

        Ok(config)
    }

    /// Check every field that can be checked offline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_url.trim().is_empty() {
            return Err(ConfigError::invalid("horizon_url", "must not be empty"));
        }
        if self.network_passphrase.is_empty() {
            return Err(ConfigError::invalid("network_passphrase", "must not be empty"));
        }
        if self.base_fee == 0 {
            return Err(ConfigError::invalid("base_fee", "must be greater than zero"));
        }
        if self.stream.reconnect_delay_ms == 0
            || self.stream.max_reconnect_delay_ms < self.stream.reconnect_delay_ms
        {
            return Err(ConfigError::invalid(
                "stream",
                "reconnect delays must be positive and max >= initial",
            ));
        }
        if self.stream.creation_poll_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "stream.creation_poll_interval_ms",
                "must be greater than zero",
            ));
        }
        self.asset()?;
        Ok(())
    }

    /// The tracked asset.
    pub fn asset(&self) -> Result<Asset, ConfigError> {
        let issuer: Address = self
            .asset_issuer
            .parse()
            .map_err(|e: kin_types::AddressError| ConfigError::invalid("asset_issuer", e.to_string()))?;
        Asset::credit(self.asset_code.clone(), issuer)
            .map_err(|e| ConfigError::invalid("asset_code", e.to_string()))
    }

    pub fn network(&self) -> Network {
        Network::new(self.network_passphrase.clone())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
