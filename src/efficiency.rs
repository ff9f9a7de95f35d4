use std::f64::consts::LN_10;
use std::fmt;

use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::calibration::{CalibrationInput, MINIMUM_POINTS};
use crate::config::EstimatorConfig;
use crate::error::ValidationError;
use crate::regression::{Coefficient, OrdinaryLeastSquares, RegressionResult, Regressor};
use crate::Result;

/// Quality indices at or above this value mark a calibration as unreliable
pub const QUALITY_THRESHOLD: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    GoodCalibrator,
    PoorCalibrator,
}

impl Classification {
    #[must_use]
    pub fn from_quality(quality_index: f64) -> Self {
        if quality_index >= QUALITY_THRESHOLD {
            Self::PoorCalibrator
        } else {
            Self::GoodCalibrator
        }
    }

    #[must_use]
    pub const fn comment(self) -> &'static str {
        match self {
            Self::GoodCalibrator => "This is a good calibrator",
            Self::PoorCalibrator => "This is not a good calibrator",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.comment())
    }
}

/// Amplification efficiency derived from a calibration curve
#[derive(Clone, Debug, PartialEq)]
pub struct EfficiencyEstimate {
    /// Fractional increase in product per cycle, `1.0` is an exact doubling
    pub value: f64,
    pub standard_error: f64,
    /// Lower and upper bound of the efficiency at `confidence_level`
    pub confidence_interval: (f64, f64),
    pub confidence_level: f64,
    pub degrees_of_freedom: usize,
    pub quality_index: f64,
    pub classification: Classification,
    /// The fit the estimate was derived from
    pub regression: RegressionResult,
}

impl EfficiencyEstimate {
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.value * 100.
    }

    /// One line digest for logs, the full table lives in [`crate::Report`]
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "efficiency {:.4}% ± {:.6}, {:.0}% interval [{:.6}, {:.6}], quality {:.6}: {}",
            self.percent(),
            self.standard_error,
            self.confidence_level * 100.,
            self.confidence_interval.0,
            self.confidence_interval.1,
            self.quality_index,
            self.classification
        )
    }

    #[must_use]
    pub fn is_good(&self) -> bool {
        self.classification == Classification::GoodCalibrator
    }
}

/// Turns calibration series into efficiency estimates using an injected regressor
#[derive(Clone, Debug, Default)]
pub struct EfficiencyEstimator<R = OrdinaryLeastSquares> {
    regressor: R,
    config: EstimatorConfig,
}

impl<R: Regressor> EfficiencyEstimator<R> {
    pub const fn new(regressor: R, config: EstimatorConfig) -> Self {
        Self { regressor, config }
    }

    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate the amplification efficiency of a validated calibration series
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the regressor fails, or the fitted slope
    /// cannot be mapped to a finite efficiency.
    pub fn estimate(&self, input: &CalibrationInput) -> Result<EfficiencyEstimate> {
        self.config.validate()?;

        let log_quantities = input.log_quantities();
        let regression =
            self.regressor
                .fit(log_quantities.view(), input.measurements(), self.config.verbose)?;
        let slope = checked_slope(regression.slope)?;
        log::debug!(
            "slope {} ± {} from {} points",
            slope.value,
            slope.standard_error,
            input.points()
        );

        let value = finite("efficiency", efficiency_from_slope(slope.value))?;
        let standard_error = finite(
            "efficiency standard error",
            propagate_standard_error(slope, value),
        )?;

        let degrees_of_freedom = input.points() - 2;
        let t = t_critical(self.config.confidence_level, degrees_of_freedom)?;
        let confidence_interval = confidence_interval(value, standard_error, t);
        log::debug!(
            "t({degrees_of_freedom}) = {t}, interval [{}, {}]",
            confidence_interval.0,
            confidence_interval.1
        );

        let quality_index = finite("quality index", quality_index(&regression))?;
        let classification = Classification::from_quality(quality_index);

        if !(0. ..=1.).contains(&value) {
            log::warn!(
                "efficiency {value} lies outside [0, 1], the calibration data is likely unreliable"
            );
        }

        let estimate = EfficiencyEstimate {
            value,
            standard_error,
            confidence_interval,
            confidence_level: self.config.confidence_level,
            degrees_of_freedom,
            quality_index,
            classification,
            regression,
        };

        if self.config.verbose {
            log::info!("{}", estimate.summary());
        }

        Ok(estimate)
    }

    /// Estimate each series independently
    pub fn estimate_all(&self, inputs: &[CalibrationInput]) -> Vec<Result<EfficiencyEstimate>> {
        inputs.iter().map(|input| self.estimate(input)).collect()
    }
}

/// Validate the inputs and estimate with the default least squares regressor
///
/// # Errors
/// Returns an error if the inputs fail validation or the estimate cannot be formed.
pub fn estimate(
    quantities: Array1<f64>,
    measurements: Array2<f64>,
    verbose: bool,
) -> Result<EfficiencyEstimate> {
    let input = CalibrationInput::new(quantities, measurements)?;
    let config = EstimatorConfig::default().with_verbose(verbose);
    EfficiencyEstimator::new(OrdinaryLeastSquares, config).estimate(&input)
}

/// Map a calibration slope to an amplification efficiency
///
/// $$ E = 10^{-1 / m} - 1 $$
///
/// A slope of $-1 / \log_{10} 2 \approx -3.32$ gives an efficiency of exactly one.
#[must_use]
pub fn efficiency_from_slope(slope: f64) -> f64 {
    10_f64.powf(-1. / slope) - 1.
}

/// First order propagation of the slope uncertainty through [`efficiency_from_slope`]
///
/// $$ \sigma_E = \sigma_m \left|\frac{dE}{dm}\right| = \sigma_m (1 + E) \frac{\ln 10}{m^2} $$
#[must_use]
pub fn propagate_standard_error(slope: Coefficient, efficiency: f64) -> f64 {
    slope.standard_error * (1. + efficiency) * LN_10 / slope.value.powi(2)
}

#[must_use]
pub fn confidence_interval(value: f64, standard_error: f64, t: f64) -> (f64, f64) {
    let half_width = t * standard_error;
    (value - half_width, value + half_width)
}

/// Two-sided Student-t critical value for `confidence_level` coverage
///
/// # Errors
/// Returns an error if the confidence level is not strictly within (0, 1) or there are no
/// degrees of freedom.
#[allow(clippy::cast_precision_loss)]
pub fn t_critical(confidence_level: f64, degrees_of_freedom: usize) -> Result<f64> {
    if !(confidence_level > 0. && confidence_level < 1.) {
        return Err(ValidationError::ConfidenceLevel(confidence_level).into());
    }
    let insufficient = || ValidationError::InsufficientPoints {
        points: degrees_of_freedom + 2,
        minimum: MINIMUM_POINTS,
    };
    if degrees_of_freedom == 0 {
        return Err(insufficient().into());
    }
    let distribution =
        StudentsT::new(0., 1., degrees_of_freedom as f64).map_err(|_| insufficient())?;
    Ok(distribution.inverse_cdf(1. - (1. - confidence_level) / 2.))
}

/// Noise of the fit relative to its slope, normalised by the total squared error
///
/// $$ Q = \frac{(CV \cdot s / m)^2}{SSE} $$
///
/// A fit without residual noise scores zero.
#[must_use]
pub fn quality_index(regression: &RegressionResult) -> f64 {
    let noise = (regression.coefficient_of_variation * regression.residual_standard_error
        / regression.slope.value)
        .powi(2);
    if noise == 0. {
        0.
    } else {
        noise / regression.sum_of_squared_errors
    }
}

fn checked_slope(slope: Coefficient) -> std::result::Result<Coefficient, ValidationError> {
    finite("slope", slope.value)?;
    finite("slope standard error", slope.standard_error)?;
    if slope.value >= 0. {
        return Err(ValidationError::NonNegativeSlope { slope: slope.value });
    }
    Ok(slope)
}

fn finite(quantity: &'static str, value: f64) -> std::result::Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::Degenerate { quantity, value })
    }
}
