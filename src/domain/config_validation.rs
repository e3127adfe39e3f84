//! Configuration sanity checks.

use crate::domain::error::QuantError;
use crate::ports::config_port::ConfigPort;

/// Validate the keys a backtest or ingestion run depends on.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    config
        .get_string("database", "path")
        .ok_or_else(|| QuantError::ConfigMissing {
            section: "database".into(),
            key: "path".into(),
        })?;

    let balance = config.get_double("backtest", "initial_balance", 10_000.0);
    if balance <= 0.0 {
        return Err(QuantError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_balance".into(),
            reason: format!("must be positive, got {balance}"),
        });
    }

    let commission = config.get_double("backtest", "commission", 0.001);
    if !(0.0..1.0).contains(&commission) {
        return Err(QuantError::ConfigInvalid {
            section: "backtest".into(),
            key: "commission".into(),
            reason: format!("must be a rate in [0, 1), got {commission}"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapConfig(std::collections::HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            MapConfig(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = MapConfig::new(&[
            ("database", "path", "data/trading.db"),
            ("backtest", "initial_balance", "10000"),
            ("backtest", "commission", "0.001"),
        ]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_database_path_fails() {
        let config = MapConfig::new(&[]);
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, QuantError::ConfigMissing { .. }));
    }

    #[test]
    fn defaults_apply_when_backtest_section_absent() {
        let config = MapConfig::new(&[("database", "path", "data/trading.db")]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn non_positive_balance_fails() {
        let config = MapConfig::new(&[
            ("database", "path", "db"),
            ("backtest", "initial_balance", "0"),
        ]);
        assert!(matches!(
            validate_config(&config).unwrap_err(),
            QuantError::ConfigInvalid { .. }
        ));
    }

    #[test]
    fn commission_must_be_a_rate() {
        let config = MapConfig::new(&[("database", "path", "db"), ("backtest", "commission", "5")]);
        assert!(matches!(
            validate_config(&config).unwrap_err(),
            QuantError::ConfigInvalid { .. }
        ));
    }
}
