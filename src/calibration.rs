use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::ValidationError;
use crate::Result;

/// The fewest calibration points which leave a degree of freedom for the confidence interval
pub const MINIMUM_POINTS: usize = 3;

/// A dilution series and the crossing points measured for it
///
/// Column `j` of `measurements` holds every replicate Ct value recorded for `quantities[j]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationInput {
    quantities: Array1<f64>,
    measurements: Array2<f64>,
}

impl CalibrationInput {
    /// Validate and wrap a calibration series
    ///
    /// # Errors
    /// Returns an error if either array is empty, a quantity is not strictly positive and finite,
    /// a measurement is not finite, the column count of `measurements` differs from the number of
    /// quantities, or fewer than [`MINIMUM_POINTS`] quantities are given.
    pub fn new(quantities: Array1<f64>, measurements: Array2<f64>) -> Result<Self> {
        validate_quantities(quantities.view())?;
        validate_measurements(measurements.view())?;

        if measurements.ncols() != quantities.len() {
            return Err(ValidationError::ColumnMismatch {
                quantities: quantities.len(),
                columns: measurements.ncols(),
            }
            .into());
        }
        if quantities.len() < MINIMUM_POINTS {
            return Err(ValidationError::InsufficientPoints {
                points: quantities.len(),
                minimum: MINIMUM_POINTS,
            }
            .into());
        }

        Ok(Self {
            quantities,
            measurements,
        })
    }

    /// Accept quantities laid out as a single row (1 x N) or a single column (N x 1)
    ///
    /// # Errors
    /// Returns an error if `quantities` has more than one row and more than one column, or under
    /// the conditions of [`CalibrationInput::new`].
    pub fn from_quantity_matrix(quantities: Array2<f64>, measurements: Array2<f64>) -> Result<Self> {
        let (rows, columns) = quantities.dim();
        if rows > 1 && columns > 1 {
            return Err(ValidationError::QuantityShape { rows, columns }.into());
        }
        let quantities = quantities.iter().copied().collect::<Array1<f64>>();
        Self::new(quantities, measurements)
    }

    /// Build from plain vectors, `measurements` given as rows of replicates
    ///
    /// # Errors
    /// Returns an error if the rows are of unequal length, or under the conditions of
    /// [`CalibrationInput::new`].
    pub fn from_rows(quantities: Vec<f64>, measurements: &[Vec<f64>]) -> Result<Self> {
        let columns = measurements.first().map_or(0, Vec::len);
        if let Some((row, found)) = measurements
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != columns)
        {
            return Err(ValidationError::RaggedRow {
                row,
                expected: columns,
                found,
            }
            .into());
        }

        let flat = measurements.iter().flatten().copied().collect::<Vec<_>>();
        let measurements = Array2::from_shape_vec((measurements.len(), columns), flat)
            .map_err(|_| ValidationError::EmptyMeasurements)?;

        Self::new(Array1::from_vec(quantities), measurements)
    }

    /// Create a `CalibrationInput` from an on-disk representation
    ///
    /// The file is a CSV with a header row. Every record is one calibration point: the quantity
    /// followed by its replicate Ct values. Records become columns of the measurement matrix.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, the records have differing numbers
    /// of replicates, or the parsed series fails validation.
    pub fn from_file(filepath: &Path) -> Result<Self> {
        let file = fs::read(filepath)?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(&file[..]);

        let mut quantities = vec![];
        let mut replicates: Vec<Vec<f64>> = vec![];

        for (row, result) in rdr.deserialize().enumerate() {
            let mut record: Vec<f64> = result?;
            if record.is_empty() {
                continue;
            }
            let quantity = record.remove(0);
            if let Some(first) = replicates.first() {
                if first.len() != record.len() {
                    return Err(ValidationError::RaggedRow {
                        row,
                        expected: first.len(),
                        found: record.len(),
                    }
                    .into());
                }
            }
            quantities.push(quantity);
            replicates.push(record);
        }
        log::debug!(
            "read {} calibration points from {}",
            quantities.len(),
            filepath.display()
        );

        // Each record is a column of the measurement matrix
        let transposed = transpose(&replicates);
        Self::from_rows(quantities, &transposed)
    }

    #[must_use]
    pub fn quantities(&self) -> ArrayView1<f64> {
        self.quantities.view()
    }

    #[must_use]
    pub fn measurements(&self) -> ArrayView2<f64> {
        self.measurements.view()
    }

    /// Number of calibration points
    #[must_use]
    pub fn points(&self) -> usize {
        self.quantities.len()
    }

    /// Number of replicate measurements per calibration point
    #[must_use]
    pub fn replicates(&self) -> usize {
        self.measurements.nrows()
    }

    /// The base-10 logarithm of each quantity, the independent variable of the calibration curve
    #[must_use]
    pub fn log_quantities(&self) -> Array1<f64> {
        self.quantities.mapv(f64::log10)
    }
}

fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|jj| rows.iter().map(|row| row[jj]).collect())
        .collect()
}

fn validate_quantities(quantities: ArrayView1<f64>) -> std::result::Result<(), ValidationError> {
    if quantities.is_empty() {
        return Err(ValidationError::EmptyQuantities);
    }
    for (index, &value) in quantities.iter().enumerate() {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteQuantity { index, value });
        }
        if value <= 0. {
            return Err(ValidationError::NonPositiveQuantity { index, value });
        }
    }
    Ok(())
}

fn validate_measurements(measurements: ArrayView2<f64>) -> std::result::Result<(), ValidationError> {
    if measurements.is_empty() {
        return Err(ValidationError::EmptyMeasurements);
    }
    if let Some(((row, column), &value)) = measurements
        .indexed_iter()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(ValidationError::NonFiniteMeasurement { row, column, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2, Array1, Array2};
    use proptest::prelude::*;

    use super::CalibrationInput;
    use crate::error::{Error, ValidationError};

    fn validation_error(result: crate::Result<CalibrationInput>) -> ValidationError {
        match result {
            Err(Error::Validation(err)) => err,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_series_is_accepted() {
        let input = CalibrationInput::new(
            arr1(&[0.1, 1., 10.]),
            arr2(&[[30., 27., 24.], [30.2, 26.8, 24.1]]),
        )
        .unwrap();

        assert_eq!(input.points(), 3);
        assert_eq!(input.replicates(), 2);
        for (actual, expected) in input.log_quantities().iter().zip([-1., 0., 1.]) {
            approx::assert_relative_eq!(*actual, expected);
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[0.1, 0., 10.]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert_eq!(
            err,
            ValidationError::NonPositiveQuantity {
                index: 1,
                value: 0.
            }
        );
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[-0.1, 1., 10.]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert!(matches!(
            err,
            ValidationError::NonPositiveQuantity { index: 0, .. }
        ));
    }

    #[test]
    fn non_finite_quantity_is_rejected() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[0.1, f64::INFINITY, 10.]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert!(matches!(err, ValidationError::NonFiniteQuantity { index: 1, .. }));

        let err = validation_error(CalibrationInput::new(
            arr1(&[f64::NAN, 1., 10.]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert!(matches!(err, ValidationError::NonFiniteQuantity { index: 0, .. }));
    }

    #[test]
    fn non_finite_measurement_is_rejected() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[0.1, 1., 10.]),
            arr2(&[[30., 27., 24.], [30., f64::NAN, 24.]]),
        ));
        assert!(matches!(
            err,
            ValidationError::NonFiniteMeasurement {
                row: 1,
                column: 1,
                ..
            }
        ));
    }

    #[test]
    fn column_mismatch_names_both_counts() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[0.1, 1., 10., 100.]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert_eq!(
            err,
            ValidationError::ColumnMismatch {
                quantities: 4,
                columns: 3
            }
        );
        let message = err.to_string();
        assert!(message.contains('4') && message.contains('3'));
    }

    #[test]
    fn two_points_leave_no_degrees_of_freedom() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[1., 10.]),
            arr2(&[[27., 24.]]),
        ));
        assert_eq!(
            err,
            ValidationError::InsufficientPoints {
                points: 2,
                minimum: 3
            }
        );
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let err = validation_error(CalibrationInput::new(
            arr1(&[]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert_eq!(err, ValidationError::EmptyQuantities);

        let err = validation_error(CalibrationInput::new(
            arr1(&[0.1, 1., 10.]),
            Array2::zeros((0, 3)),
        ));
        assert_eq!(err, ValidationError::EmptyMeasurements);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = validation_error(CalibrationInput::from_rows(
            vec![0.1, 1., 10.],
            &[vec![30., 27., 24.], vec![30., 27.]],
        ));
        assert_eq!(
            err,
            ValidationError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn row_and_column_quantities_are_normalised() {
        let measurements = arr2(&[[30., 27., 24.], [30.2, 26.8, 24.1]]);
        let flat = CalibrationInput::new(arr1(&[0.1, 1., 10.]), measurements.clone()).unwrap();

        let row = CalibrationInput::from_quantity_matrix(
            arr2(&[[0.1, 1., 10.]]),
            measurements.clone(),
        )
        .unwrap();
        let column = CalibrationInput::from_quantity_matrix(
            arr2(&[[0.1], [1.], [10.]]),
            measurements,
        )
        .unwrap();

        assert_eq!(row, flat);
        assert_eq!(column, flat);
    }

    #[test]
    fn quantity_matrix_must_be_a_vector() {
        let err = validation_error(CalibrationInput::from_quantity_matrix(
            arr2(&[[0.1, 1., 10.], [0.2, 2., 20.]]),
            arr2(&[[30., 27., 24.]]),
        ));
        assert_eq!(
            err,
            ValidationError::QuantityShape {
                rows: 2,
                columns: 3
            }
        );
    }

    fn dilution(points: usize) -> Array1<f64> {
        (0..points)
            .map(|ii| 10_f64.powi(i32::try_from(ii).unwrap() - 2))
            .collect()
    }

    proptest! {
        #[test]
        fn column_count_must_equal_quantity_count(
            points in 3usize..12,
            columns in 1usize..12,
            replicates in 1usize..5,
        ) {
            let measurements = Array2::from_elem((replicates, columns), 25.);
            let result = CalibrationInput::new(dilution(points), measurements);

            if columns == points {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(
                    validation_error(result),
                    ValidationError::ColumnMismatch { quantities: points, columns }
                );
            }
        }

        #[test]
        fn out_of_domain_quantities_are_rejected(
            points in 3usize..12,
            position in 0usize..12,
            bad in prop_oneof![
                Just(0.),
                Just(-0.),
                -1e6..0.0_f64,
                Just(f64::NAN),
                Just(f64::INFINITY),
                Just(f64::NEG_INFINITY),
            ],
        ) {
            let index = position % points;
            let mut quantities = dilution(points);
            quantities[index] = bad;
            let measurements = Array2::from_elem((2, points), 25.);

            let err = validation_error(CalibrationInput::new(quantities, measurements));
            let rejected_at = match err {
                ValidationError::NonPositiveQuantity { index, .. }
                | ValidationError::NonFiniteQuantity { index, .. } => Some(index),
                _ => None,
            };
            prop_assert_eq!(rejected_at, Some(index));
        }
    }
}
