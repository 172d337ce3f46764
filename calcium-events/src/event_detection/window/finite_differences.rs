use super::Real;
use crate::error::AnalysisError;
use itertools::Itertools;

fn slope((t0, v0): (Real, Real), (t1, v1): (Real, Real)) -> Real {
    (v1 - v0) / (t1 - t0)
}

/// Derivative of `values` with respect to `time`: central differences in the
/// interior, one-sided differences at the first and last sample.
pub fn derivative(time: &[Real], values: &[Real]) -> Result<Vec<Real>, AnalysisError> {
    if time.len() != values.len() {
        return Err(AnalysisError::MalformedInput(format!(
            "{} time points for {} values",
            time.len(),
            values.len()
        )));
    }
    let points: Vec<(Real, Real)> = time.iter().copied().zip(values.iter().copied()).collect();
    let (Some(&first), Some(&second), Some(&penultimate), Some(&last)) = (
        points.first(),
        points.get(1),
        points.iter().rev().nth(1),
        points.last(),
    ) else {
        return Err(AnalysisError::InsufficientData {
            len: points.len(),
            required: 2,
            requirement: "derivative",
        });
    };

    let interior = points
        .iter()
        .tuple_windows()
        .map(|(&before, _, &after)| slope(before, after));

    Ok(std::iter::once(slope(first, second))
        .chain(interior)
        .chain(std::iter::once(slope(penultimate, last)))
        .collect())
}
