use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Ask the regressor for its own diagnostics and log the assembled estimate
    pub verbose: bool,
    /// Two-sided coverage of the efficiency confidence interval
    pub confidence_level: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            confidence_level: 0.95,
        }
    }
}

impl EstimatorConfig {
    /// Read a config from a TOML file, missing keys take their defaults
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or the parsed config is invalid.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        log::debug!("loaded estimator config from {}", path.display());
        Ok(config)
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// # Errors
    /// Returns an error if the confidence level is not strictly between zero and one.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.confidence_level > 0. && self.confidence_level < 1. {
            Ok(())
        } else {
            Err(ValidationError::ConfidenceLevel(self.confidence_level))
        }
    }
}
