//! Weighted random selection
//!
//! Cumulative-probability draw over an ordered candidate set.

use rand::Rng;
use thiserror::Error;

/// Errors from candidate selection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("number of weights ({weights}) does not match number of candidates ({candidates})")]
    WeightMismatch { candidates: usize, weights: usize },
}

/// Draw one candidate according to the cumulative distribution of `weights`,
/// uniform when none are given.
///
/// Weights are not normalized: if they sum to less than 1 the draw can come
/// up empty, which callers must treat as a skipped selection.
pub fn pick<'a, T>(
    candidates: &'a [T],
    weights: Option<&[f64]>,
) -> Result<Option<&'a T>, SelectionError> {
    pick_with_value(candidates, weights, rand::rng().random::<f64>())
}

/// Deterministic core of [`pick`]; `r` must lie in `[0, 1)`.
pub fn pick_with_value<'a, T>(
    candidates: &'a [T],
    weights: Option<&[f64]>,
    r: f64,
) -> Result<Option<&'a T>, SelectionError> {
    if let Some(weights) = weights {
        if weights.len() != candidates.len() {
            return Err(SelectionError::WeightMismatch {
                candidates: candidates.len(),
                weights: weights.len(),
            });
        }
    }

    let uniform = 1.0 / candidates.len() as f64;
    let mut acc = 0.0;
    for (i, candidate) in candidates.iter().enumerate() {
        acc += weights.map_or(uniform, |w| w[i]);
        if r < acc {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
