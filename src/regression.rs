use itertools::{Itertools, MinMaxResult};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::error::RegressionError;

/// A fitted coefficient and its standard error
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficient {
    pub value: f64,
    pub standard_error: f64,
}

/// Statistics of a straight line fitted through a calibration series
#[derive(Clone, Debug, PartialEq)]
pub struct RegressionResult {
    pub slope: Coefficient,
    pub intercept: Coefficient,
    /// Residual standard error as a percentage of the mean response
    pub coefficient_of_variation: f64,
    /// Square root of the residual variance over every observation, $\sqrt{SSE / (MN - 2)}$
    pub residual_standard_error: f64,
    pub sum_of_squared_errors: f64,
    pub r_squared: f64,
    /// Number of calibration points entering the fit
    pub points: usize,
    /// Number of individual measurements, replicates included
    pub observations: usize,
}

impl RegressionResult {
    /// Response predicted by the fitted line at `x`
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.value.mul_add(x, self.intercept.value)
    }

    #[must_use]
    pub const fn degrees_of_freedom(&self) -> usize {
        self.points.saturating_sub(2)
    }
}

/// A linear regression engine
///
/// `x` holds one value per calibration point, each column of `y` holds the replicate responses
/// for the matching entry of `x`. How replicates are combined is left to the implementation.
pub trait Regressor {
    /// Fit a straight line `y = intercept + slope * x`
    ///
    /// When `verbose` is set the implementation may emit its own diagnostics. This must not
    /// change the returned value.
    ///
    /// # Errors
    /// Returns an error when the inputs cannot support a fit.
    fn fit(
        &self,
        x: ArrayView1<f64>,
        y: ArrayView2<f64>,
        verbose: bool,
    ) -> Result<RegressionResult, RegressionError>;
}

/// Ordinary least squares through every replicate of every column
///
/// Residual statistics are taken over all observations so scatter between replicates shows up in
/// the standard errors and the coefficient of variation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrdinaryLeastSquares;

impl Regressor for OrdinaryLeastSquares {
    #[allow(clippy::cast_precision_loss)]
    fn fit(
        &self,
        x: ArrayView1<f64>,
        y: ArrayView2<f64>,
        verbose: bool,
    ) -> Result<RegressionResult, RegressionError> {
        let points = x.len();
        if y.ncols() != points {
            return Err(RegressionError::ShapeMismatch {
                points,
                columns: y.ncols(),
            });
        }
        if points < 3 || y.nrows() == 0 {
            return Err(RegressionError::TooFewPoints { points });
        }

        let means: Array1<f64> = y
            .mean_axis(Axis(0))
            .ok_or(RegressionError::TooFewPoints { points })?;

        let n = points as f64;
        let replicates = y.nrows() as f64;
        let observations = y.len();
        let x_mean = x.sum() / n;
        let y_mean = means.sum() / n;

        let sxx: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum();
        let sxy: f64 = x
            .iter()
            .zip(means.iter())
            .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
            .sum();

        // Relative tolerance, exact equality misses log10 round-off
        if sxx <= f64::EPSILON * x.iter().map(|xi| xi * xi).sum::<f64>().max(f64::MIN_POSITIVE) {
            return Err(RegressionError::ConstantPredictor);
        }

        // With the same number of replicates at every x the line through the means is the least
        // squares line through every observation
        let slope = sxy / sxx;
        let intercept = slope.mul_add(-x_mean, y_mean);

        let fitted = x.mapv(|xi| slope.mul_add(xi, intercept));
        let sum_of_squared_errors: f64 = (&y - &fitted).mapv(|residual| residual.powi(2)).sum();
        let sst: f64 = y.mapv(|yi| (yi - y_mean).powi(2)).sum();

        let residual_standard_error =
            (sum_of_squared_errors / (observations as f64 - 2.)).sqrt();
        let slope_standard_error = residual_standard_error / (replicates * sxx).sqrt();
        let intercept_standard_error = residual_standard_error
            * (1. / (replicates * n) + x_mean.powi(2) / (replicates * sxx)).sqrt();
        let coefficient_of_variation = 100. * residual_standard_error / y_mean.abs();
        let r_squared = if sst > 0. {
            1. - sum_of_squared_errors / sst
        } else {
            1.
        };

        let result = RegressionResult {
            slope: Coefficient {
                value: slope,
                standard_error: slope_standard_error,
            },
            intercept: Coefficient {
                value: intercept,
                standard_error: intercept_standard_error,
            },
            coefficient_of_variation,
            residual_standard_error,
            sum_of_squared_errors,
            r_squared,
            points,
            observations,
        };

        let statistics = [
            slope,
            intercept,
            slope_standard_error,
            intercept_standard_error,
            residual_standard_error,
            sum_of_squared_errors,
            r_squared,
        ];
        if statistics.iter().any(|value| !value.is_finite()) {
            return Err(RegressionError::NonFinite);
        }

        if verbose {
            log_summary(&result, x);
        }

        Ok(result)
    }
}

fn log_summary(result: &RegressionResult, x: ArrayView1<f64>) {
    log::info!(
        "fitted y = {:.4} (± {:.4}) + {:.4} (± {:.4}) x over {} points",
        result.intercept.value,
        result.intercept.standard_error,
        result.slope.value,
        result.slope.standard_error,
        result.points
    );
    if let MinMaxResult::MinMax(lower, upper) = x.iter().minmax_by(|a, b| a.total_cmp(b)) {
        log::info!("x spans [{lower:.4}, {upper:.4}]");
    }
    log::info!(
        "r² = {:.6}, SSE = {:.6}, residual s = {:.6}, CV = {:.4}%",
        result.r_squared,
        result.sum_of_squared_errors,
        result.residual_standard_error,
        result.coefficient_of_variation
    );
}
