#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod calibration;
pub mod config;
pub mod efficiency;
pub mod error;
pub mod regression;
pub mod report;

pub use calibration::CalibrationInput;
pub use config::EstimatorConfig;
pub use efficiency::{estimate, Classification, EfficiencyEstimate, EfficiencyEstimator};
pub use error::{Error, RegressionError, ValidationError};
pub use regression::{OrdinaryLeastSquares, RegressionResult, Regressor};
pub use report::Report;

pub type Result<T> = ::std::result::Result<T, Error>;
