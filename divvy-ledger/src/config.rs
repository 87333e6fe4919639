//! Configuration for the ledger

use crate::money::Currency;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger currency code (all accounts share one currency)
    pub currency: String,

    /// Transaction execution configuration
    pub transactions: TransactionConfig,

    /// Reconciliation configuration
    pub reconciliation: ReconciliationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "divvy-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            currency: "USD".to_string(),
            transactions: TransactionConfig::default(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

/// Transaction execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Retry budget per transaction
    pub max_retries: u32,

    /// Whether wallet accounts may go negative
    pub allow_overdraft: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            allow_overdraft: false,
        }
    }
}

/// Reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Verify the exact-sum invariant on every expense write
    pub verify_on_write: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            verify_on_write: true,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(currency) = std::env::var("DIVVY_CURRENCY") {
            config.currency = currency;
        }

        if let Ok(max_retries) = std::env::var("DIVVY_MAX_RETRIES") {
            config.transactions.max_retries = max_retries
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid DIVVY_MAX_RETRIES: {}", max_retries)))?;
        }

        if let Ok(overdraft) = std::env::var("DIVVY_ALLOW_OVERDRAFT") {
            config.transactions.allow_overdraft = overdraft == "1" || overdraft == "true";
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolve the configured currency code
    pub fn resolved_currency(&self) -> crate::Result<Currency> {
        Currency::from_code(&self.currency)
            .ok_or_else(|| crate::Error::Config(format!("Unknown currency: {}", self.currency)))
    }

    fn validate(&self) -> crate::Result<()> {
        self.resolved_currency()?;
        Ok(())
    }
}
