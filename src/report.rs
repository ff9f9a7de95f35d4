use std::fmt;

use crate::efficiency::EfficiencyEstimate;

/// Fixed layout table of an efficiency estimate
///
/// ```
/// use ndarray::{arr1, arr2};
/// use pcr_efficiency::{estimate, Report};
///
/// let quantities = arr1(&[0.12, 0.5, 3., 15., 30.]);
/// let measurements = arr2(&[[35.5, 33.4, 30.8, 28.4, 27.4], [35.4, 33.3, 30.9, 28.3, 27.5]]);
/// let estimate = estimate(quantities, measurements, false).unwrap();
///
/// let table = Report::new(&estimate).to_string();
/// assert!(table.contains("Efficiency"));
/// assert!(table.contains("This is a good calibrator"));
/// ```
pub struct Report<'a> {
    estimate: &'a EfficiencyEstimate,
    with_fit: bool,
}

const RULE_WIDTH: usize = 92;

impl<'a> Report<'a> {
    #[must_use]
    pub const fn new(estimate: &'a EfficiencyEstimate) -> Self {
        Self {
            estimate,
            with_fit: false,
        }
    }

    /// Also print the fitted calibration line and its diagnostics
    #[must_use]
    pub const fn with_fit(mut self, with_fit: bool) -> Self {
        self.with_fit = with_fit;
        self
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let estimate = self.estimate;
        let (lower, upper) = estimate.confidence_interval;

        writeln!(
            f,
            "{:>12}  {:>14}  {:>24}  {:>10}  {}",
            "Efficiency", "Standard Error", "Confidence Interval", "Quality", "Comment"
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        write!(
            f,
            "{:>11.4}%  {:>14.6}  {:>24}  {:>10.6}  {}",
            estimate.percent(),
            estimate.standard_error,
            format!("[{lower:.6}, {upper:.6}]"),
            estimate.quality_index,
            estimate.classification
        )?;

        if self.with_fit {
            let fit = &estimate.regression;
            writeln!(f)?;
            writeln!(f)?;
            writeln!(
                f,
                "Calibration curve: Ct = {:.4} (± {:.4}) {} {:.4} (± {:.4}) log10(quantity)",
                fit.intercept.value,
                fit.intercept.standard_error,
                if fit.slope.value < 0. { '-' } else { '+' },
                fit.slope.value.abs(),
                fit.slope.standard_error
            )?;
            writeln!(
                f,
                "Points: {} ({} observations)  r²: {:.6}  SSE: {:.6}  residual s: {:.6}  CV: {:.4}%",
                fit.points,
                fit.observations,
                fit.r_squared,
                fit.sum_of_squared_errors,
                fit.residual_standard_error,
                fit.coefficient_of_variation
            )?;
            write!(
                f,
                "Interval: {:.0}% Student-t with {} degrees of freedom",
                estimate.confidence_level * 100.,
                estimate.degrees_of_freedom
            )?;
        }
        Ok(())
    }
}
