//! Engine configuration, loadable from JSON.

use serde::Deserialize;

use crate::context::Communicator;
use crate::error::{Error, Result};

/// Settings owned by the driving process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Integration time step used to derive simulation time.
    pub time_step: f64,
    /// Rank of this process.
    pub rank: usize,
    /// Number of cooperating processes.
    pub size: usize,
}

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings against each other.
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        self.communicator().map(|_| ())
    }

    /// The communicator described by `rank` and `size`.
    pub fn communicator(&self) -> Result<Communicator> {
        Communicator::new(self.rank, self.size)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0,
            rank: 0,
            size: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = EngineConfig::from_json(r#"{ "time_step": 0.5 }"#).unwrap();
        assert_eq!(config.time_step, 0.5);
        assert_eq!(config.rank, 0);
        assert_eq!(config.size, 1);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_json(r#"{ "timestep": 0.5 }"#).unwrap_err();
        assert!(matches!(err, Error::EngineConfig(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn rank_outside_the_run_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "rank": 3, "size": 2 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(err.exit_code(), 1);

        let config = EngineConfig::from_json(r#"{ "rank": 1, "size": 2 }"#).unwrap();
        assert!(!config.communicator().unwrap().is_designated_writer());
    }

    #[test]
    fn time_step_must_be_positive() {
        let err = EngineConfig::from_json(r#"{ "time_step": 0.0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
