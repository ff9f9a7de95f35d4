use thiserror::Error;

/// Top level failure of an efficiency estimate, or of loading its inputs
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("regression failed: {0}")]
    Regression(#[from] RegressionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Input, or an intermediate value derived from it, lies outside the domain of the estimate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("quantities must contain at least one value")]
    EmptyQuantities,
    #[error("measurements must contain at least one row and one column")]
    EmptyMeasurements,
    #[error("quantity {value} at index {index} must be strictly positive")]
    NonPositiveQuantity { index: usize, value: f64 },
    #[error("quantity {value} at index {index} must be finite")]
    NonFiniteQuantity { index: usize, value: f64 },
    #[error("measurement {value} at row {row}, column {column} must be finite")]
    NonFiniteMeasurement { row: usize, column: usize, value: f64 },
    #[error("measurements have {columns} columns but there are {quantities} quantities, the counts must match")]
    ColumnMismatch { quantities: usize, columns: usize },
    #[error("{points} calibration points leave no degrees of freedom for the confidence interval, at least {minimum} are required")]
    InsufficientPoints { points: usize, minimum: usize },
    #[error("fitted slope {slope} must be negative for the efficiency transform to be defined")]
    NonNegativeSlope { slope: f64 },
    #[error("{quantity} evaluated to {value}, the fitted slope is numerically degenerate")]
    Degenerate { quantity: &'static str, value: f64 },
    #[error("confidence level {0} must lie strictly between 0 and 1")]
    ConfidenceLevel(f64),
    #[error("quantities must be a single row or column, got a {rows} x {columns} matrix")]
    QuantityShape { rows: usize, columns: usize },
    /// `row` is the offending row as handed to the loader, a replicate row for in-memory series
    /// or a data record for files. Counts are Ct values only, the quantity field is excluded.
    #[error("row {row} has {found} Ct values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// The regression collaborator could not produce a fit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegressionError {
    #[error("the independent variable is constant, the slope is not identifiable")]
    ConstantPredictor,
    #[error("{points} points are too few for a linear fit with residual statistics")]
    TooFewPoints { points: usize },
    #[error("the dependent variable has {columns} columns but there are {points} points")]
    ShapeMismatch { points: usize, columns: usize },
    #[error("the fit produced non-finite statistics")]
    NonFinite,
}
