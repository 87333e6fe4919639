//! Configuration for the settlement engine

use serde::{Deserialize, Serialize};

/// Settlement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Imbalance and residue tolerance in minor units.
    ///
    /// Positions whose magnitude is at or below this are treated as
    /// already settled, and a group whose nets sum to within this of
    /// zero passes the precondition check.
    pub tolerance_minor_units: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance_minor_units: 1,
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

        if let Ok(tolerance) = std::env::var("DIVVY_SETTLE_TOLERANCE") {
            config.tolerance_minor_units = tolerance.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid DIVVY_SETTLE_TOLERANCE: {}", tolerance))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.tolerance_minor_units < 0 {
            return Err(crate::Error::Config(
                "tolerance_minor_units must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tolerance_minor_units, 1);
    }

    #[test]
    fn test_parse_from_toml() {
        let config: Config = toml::from_str("tolerance_minor_units = 5").unwrap();
        assert_eq!(config.tolerance_minor_units, 5);
    }
}
