use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Immutable per-network settings, fixed when the currency network is
/// deployed and handed to the graph at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Divisor of the capacity imbalance fee. `0` disables fees.
    #[serde(default)]
    pub capacity_imbalance_fee_divisor: u64,
    /// Interest rate (0.01% per year) applied to every trustline when custom
    /// interests are disabled.
    #[serde(default)]
    pub default_interest_rate: i64,
    /// Whether each trustline carries its own pair of interest rates.
    #[serde(default)]
    pub custom_interests: bool,
}

impl NetworkConfig {
    pub fn new(capacity_imbalance_fee_divisor: u64) -> Self {
        Self {
            capacity_imbalance_fee_divisor,
            ..Self::default()
        }
    }

    pub fn with_default_interest_rate(mut self, rate: i64) -> Self {
        self.default_interest_rate = rate;
        self
    }

    pub fn with_custom_interests(mut self, enabled: bool) -> Self {
        self.custom_interests = enabled;
        self
    }

    /// True when balances can grow through interest, which makes the time
    /// of every balance write significant.
    pub fn interests_enabled(&self) -> bool {
        self.custom_interests || self.default_interest_rate != 0
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.capacity_imbalance_fee_divisor == 1 {
            return Err(CoreError::InvalidConfig(
                "capacity_imbalance_fee_divisor must be 0 or at least 2".into(),
            ));
        }
        if self.default_interest_rate < 0 {
            return Err(CoreError::InvalidConfig(format!(
                "default_interest_rate must not be negative, got {}",
                self.default_interest_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.capacity_imbalance_fee_divisor, 0);
        assert!(!config.interests_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interests_enabled() {
        assert!(NetworkConfig::new(100).with_default_interest_rate(100).interests_enabled());
        assert!(NetworkConfig::new(100).with_custom_interests(true).interests_enabled());
        assert!(!NetworkConfig::new(100).interests_enabled());
    }

    #[test]
    fn test_validate_rejects_divisor_one() {
        assert!(NetworkConfig::new(1).validate().is_err());
        assert!(NetworkConfig::new(2).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_rate() {
        let config = NetworkConfig::new(100).with_default_interest_rate(-1);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"capacity_imbalance_fee_divisor": 1000}"#).unwrap();
        assert_eq!(config.capacity_imbalance_fee_divisor, 1000);
        assert_eq!(config.default_interest_rate, 0);
        assert!(!config.custom_interests);
    }
}
