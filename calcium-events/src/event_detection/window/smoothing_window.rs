use super::Real;
use crate::error::AnalysisError;
use nalgebra::{DMatrix, DVector};

/// Savitzky-Golay filter: fits a polynomial of order `polynomial_order` by
/// least squares to each window of `window_length` samples and evaluates it
/// at the window centre. The first and last `window_length / 2` samples are
/// evaluated on the fit of the first and last complete window, so the output
/// has the same length as the input.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window_length: usize,
    /// `coefficients[p]` evaluates the window fit at offset `p` into the window.
    coefficients: Vec<Vec<Real>>,
}

impl SavitzkyGolay {
    pub fn new(window_length: usize, polynomial_order: usize) -> Result<Self, AnalysisError> {
        if window_length % 2 == 0 {
            return Err(AnalysisError::invalid(
                "smoothing_window",
                format!("{window_length} is not odd"),
            ));
        }
        if polynomial_order >= window_length {
            return Err(AnalysisError::invalid(
                "smoothing_order",
                format!("{polynomial_order} is not less than the window length {window_length}"),
            ));
        }

        let half = window_length / 2;
        let scale = half.max(1) as Real;
        let abscissa = |position: usize| (position as Real - half as Real) / scale;

        let design = DMatrix::<Real>::from_fn(window_length, polynomial_order + 1, |row, col| {
            abscissa(row).powi(col as i32)
        });
        let normal = design.transpose() * &design;
        let inverse = normal.try_inverse().ok_or_else(|| {
            AnalysisError::invalid("smoothing_order", "least squares system is singular")
        })?;
        let projection = inverse * design.transpose();

        let coefficients = (0..window_length)
            .map(|position| {
                let basis = DVector::<Real>::from_fn(polynomial_order + 1, |power, _| {
                    abscissa(position).powi(power as i32)
                });
                projection.tr_mul(&basis).iter().copied().collect()
            })
            .collect();

        Ok(Self {
            window_length,
            coefficients,
        })
    }

    pub fn apply(&self, values: &[Real]) -> Result<Vec<Real>, AnalysisError> {
        let len = values.len();
        let width = self.window_length;
        if len < width {
            return Err(AnalysisError::InsufficientData {
                len,
                required: width,
                requirement: "smoothing_window",
            });
        }
        let half = width / 2;

        Ok((0..len)
            .map(|i| {
                let (start, position) = if i < half {
                    (0, i)
                } else if i + half >= len {
                    (len - width, i + width - len)
                } else {
                    (i - half, half)
                };
                values[start..start + width]
                    .iter()
                    .zip(&self.coefficients[position])
                    .map(|(value, weight)| value * weight)
                    .sum()
            })
            .collect())
    }
}

/// Smooths `values` with a [SavitzkyGolay] filter.
pub fn smooth(
    values: &[Real],
    window_length: usize,
    polynomial_order: usize,
) -> Result<Vec<Real>, AnalysisError> {
    SavitzkyGolay::new(window_length, polynomial_order)?.apply(values)
}
