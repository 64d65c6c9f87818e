//! Evaluator configuration.
//!
//! Precedence is explicit values (CLI flags) over environment variables over
//! the defaults below.

use serde::{Deserialize, Serialize};

pub const MAX_REPAIRS_ENV: &str = "CQA_MAX_REPAIRS";
pub const WARN_REPAIRS_ENV: &str = "CQA_WARN_REPAIRS";

pub const DEFAULT_WARN_REPAIRS_ABOVE: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Log a warning when a plan has more repairs than this.
    pub warn_repairs_above: u64,
    /// Refuse to enumerate plans with more repairs than this. `None` leaves
    /// enumeration unbounded.
    pub max_repairs: Option<u64>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            warn_repairs_above: DEFAULT_WARN_REPAIRS_ABOVE,
            max_repairs: None,
        }
    }
}

impl EvaluatorConfig {
    /// Defaults overridden by `CQA_WARN_REPAIRS` / `CQA_MAX_REPAIRS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = read_env_u64(WARN_REPAIRS_ENV) {
            config.warn_repairs_above = n;
        }
        if let Some(n) = read_env_u64(MAX_REPAIRS_ENV) {
            config.max_repairs = Some(n);
        }
        config
    }

    pub fn with_max_repairs(mut self, max: Option<u64>) -> Self {
        if max.is_some() {
            self.max_repairs = max;
        }
        self
    }

    pub fn with_warn_repairs_above(mut self, warn: Option<u64>) -> Self {
        if let Some(n) = warn {
            self.warn_repairs_above = n;
        }
        self
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(err) => {
            tracing::warn!(var = name, value = %raw, error = %err, "ignoring non-numeric setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_override_defaults() {
        let c = EvaluatorConfig::default()
            .with_max_repairs(Some(10))
            .with_warn_repairs_above(None);
        assert_eq!(c.max_repairs, Some(10));
        assert_eq!(c.warn_repairs_above, DEFAULT_WARN_REPAIRS_ABOVE);
    }

    #[test]
    fn deserialises_partial_config() {
        let c: EvaluatorConfig = serde_json::from_str(r#"{"max_repairs": 5}"#).unwrap();
        assert_eq!(c.max_repairs, Some(5));
        assert_eq!(c.warn_repairs_above, DEFAULT_WARN_REPAIRS_ABOVE);
    }
}
