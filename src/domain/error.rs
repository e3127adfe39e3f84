//! Domain error types.

/// Top-level error type for quantrader.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("insufficient free balance for {asset}: have {have:.8}, need {need:.8}")]
    InsufficientFree { asset: String, have: f64, need: f64 },

    #[error("insufficient locked balance for {asset}: have {have:.8}, need {need:.8}")]
    InsufficientLocked { asset: String, have: f64, need: f64 },

    #[error("insufficient position: have {have:.8}, need {need:.8}")]
    PositionShortfall { have: f64, need: f64 },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("upstream error: {reason}")]
    Upstream { reason: String },

    #[error("strategy error at candle {index}: {reason}")]
    Strategy { index: usize, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&QuantError> for std::process::ExitCode {
    fn from(err: &QuantError) -> Self {
        let code: u8 = match err {
            QuantError::Io(_) => 1,
            QuantError::ConfigParse { .. }
            | QuantError::ConfigMissing { .. }
            | QuantError::ConfigInvalid { .. } => 2,
            QuantError::Storage { .. } => 3,
            QuantError::Upstream { .. } => 4,
            QuantError::Validation { .. } => 5,
            QuantError::InsufficientFree { .. }
            | QuantError::InsufficientLocked { .. }
            | QuantError::PositionShortfall { .. } => 6,
            QuantError::Strategy { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        let err = QuantError::InsufficientFree {
            asset: "USDT".into(),
            have: 10.0,
            need: 20.0,
        };
        assert_eq!(
            err.to_string(),
            "insufficient free balance for USDT: have 10.00000000, need 20.00000000"
        );

        let err = QuantError::Strategy {
            index: 42,
            reason: "boom".into(),
        };
        assert_eq!(err.to_string(), "strategy error at candle 42: boom");
    }

    #[test]
    fn exit_code_conversion_compiles_for_all_categories() {
        use std::process::ExitCode;
        let errors = [
            QuantError::Storage { reason: "x".into() },
            QuantError::Validation { reason: "x".into() },
            QuantError::Upstream { reason: "x".into() },
        ];
        for err in &errors {
            let _: ExitCode = err.into();
        }
    }
}
