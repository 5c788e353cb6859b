use std::{env, str::FromStr};

use rust_decimal::Decimal;
use splitledger_domain::{RoundingMode, SettlementContext, SettlementRoundingError};
use tracing_subscriber::EnvFilter;

pub const SCALE_VAR: &str = "SPLITLEDGER_SCALE";
pub const ROUNDING_VAR: &str = "SPLITLEDGER_ROUNDING";
pub const SPLIT_TOLERANCE_VAR: &str = "SPLITLEDGER_SPLIT_TOLERANCE";
pub const EPSILON_VAR: &str = "SPLITLEDGER_EPSILON";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidScale { key: &'static str, value: String },
    #[error("{key} must be 'half-up' or 'half-even', got '{value}'")]
    InvalidRounding { key: &'static str, value: String },
    #[error("{key} must be a non-negative decimal, got '{value}'")]
    InvalidDecimal { key: &'static str, value: String },
    #[error(transparent)]
    UnsupportedScale(#[from] SettlementRoundingError),
}

/// Settings read from `.env` and the process environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub context: SettlementContext,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset variables keep their defaults; the scale is applied first so the
    /// other values can override what it derives.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut context = match lookup(SCALE_VAR) {
            Some(value) => {
                let scale = value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidScale {
                    key: SCALE_VAR,
                    value: value.clone(),
                })?;
                SettlementContext::with_scale(scale)?
            }
            None => SettlementContext::default(),
        };

        if let Some(value) = lookup(ROUNDING_VAR) {
            let mode = value.trim().to_ascii_lowercase();
            context.rounding_mode = match mode.as_str() {
                "half-up" => RoundingMode::HalfUp,
                "half-even" => RoundingMode::HalfEven,
                _ => {
                    return Err(ConfigError::InvalidRounding {
                        key: ROUNDING_VAR,
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup(SPLIT_TOLERANCE_VAR) {
            context.split_tolerance = parse_non_negative(SPLIT_TOLERANCE_VAR, value)?;
        }
        if let Some(value) = lookup(EPSILON_VAR) {
            context.epsilon = parse_non_negative(EPSILON_VAR, value)?;
        }

        Ok(Self { context })
    }
}

fn parse_non_negative(key: &'static str, value: String) -> Result<Decimal, ConfigError> {
    match Decimal::from_str(value.trim()) {
        Ok(parsed) if !parsed.is_sign_negative() => Ok(parsed),
        _ => Err(ConfigError::InvalidDecimal { key, value }),
    }
}

/// Logs go to stderr so report output on stdout stays clean. `RUST_LOG` overrides the level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
