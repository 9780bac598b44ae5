use ndarray::{Array2, ArrayView2, Axis};
use rand::Rng;

use crate::error::{Error, Result};

/// Selects `num_points` rows of `points` uniformly at random, without replacement.
/// The order of the selected rows is random as well.
pub fn subsample<R: Rng + ?Sized>(
    points: &ArrayView2<f32>,
    num_points: usize,
    rng: &mut R,
) -> Result<Array2<f32>> {
    let available = points.nrows();
    if num_points > available {
        return Err(Error::invalid_parameter(format!(
            "Cannot subsample {num_points} points from {available} without replacement"
        )));
    }

    let indices = rand::seq::index::sample(rng, available, num_points).into_vec();
    Ok(points.select(Axis(0), &indices))
}
