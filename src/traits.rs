//! Traits at the seams between parameter sets, datasets and fitted models

use crate::dataset::{Dataset, Float};
use crate::error::Result;

/// Fit a model from a parameter set and a dataset.
///
/// Fitting is a pure function of its inputs: repeated calls with the same
/// dataset and parameters return the same model, and no state is shared
/// between calls.
pub trait Fit<F: Float> {
    type Object;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object>;
}

/// Predict targets for a feature matrix.
pub trait Predict<X, Y> {
    fn predict(&self, x: X) -> Y;
}
