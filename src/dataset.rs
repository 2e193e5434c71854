//! Dense in-memory datasets
//!
//! A dataset pairs a numeric design matrix with one target per row. Encoding
//! heterogeneous records into such a matrix (one-hot expansion, imputation and
//! the like) is an upstream concern; this crate only consumes the result.

use std::fmt;
use std::iter::Sum;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, ScalarOperand};
use num_traits::{FromPrimitive, NumAssignOps, NumCast};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumptions on floating
/// point numbers and implements them for 32bit and 64bit floating points. They
/// are used in records of a dataset and in the targets as well.
pub trait Float:
    'static
    + num_traits::Float
    + FromPrimitive
    + NumAssignOps
    + ScalarOperand
    + fmt::Debug
    + fmt::Display
    + Default
    + Sum
    + Send
    + Sync
    + approx::AbsDiffEq<Epsilon = Self>
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}
impl Float for f64 {}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// A design matrix of shape `(n_samples, n_features)` paired with a target
/// vector of length `n_samples`.
///
/// Both members are owned and immutable once constructed; every fit in this
/// crate reads them through views and allocates its own working arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<F> {
    records: Array2<F>,
    targets: Array1<F>,
}

impl<F: Float> Dataset<F> {
    /// Pair a design matrix with its targets.
    ///
    /// Shapes are validated when a fit begins, not here.
    pub fn new(records: Array2<F>, targets: Array1<F>) -> Dataset<F> {
        Dataset { records, targets }
    }

    pub fn records(&self) -> ArrayView2<'_, F> {
        self.records.view()
    }

    pub fn targets(&self) -> ArrayView1<'_, F> {
        self.targets.view()
    }

    pub fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    pub fn nfeatures(&self) -> usize {
        self.records.ncols()
    }

    /// Copy out the rows at `indices`, in the given order.
    ///
    /// Used to carve training and validation subsets out of a dataset.
    pub fn select(&self, indices: &[usize]) -> Dataset<F> {
        Dataset {
            records: self.records.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
        }
    }
}

impl<F: Float> From<(Array2<F>, Array1<F>)> for Dataset<F> {
    fn from(records_targets: (Array2<F>, Array1<F>)) -> Dataset<F> {
        Dataset::new(records_targets.0, records_targets.1)
    }
}

#[cfg(test)]
mod tests {
    use super::Dataset;
    use ndarray::array;

    #[test]
    fn select_copies_rows_in_order() {
        let dataset = Dataset::new(
            array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
            array![1.0, 2.0, 3.0],
        );

        let subset = dataset.select(&[2, 0]);
        assert_eq!(subset.records(), array![[5.0, 6.0], [1.0, 2.0]]);
        assert_eq!(subset.targets(), array![3.0, 1.0]);
        assert_eq!(subset.nsamples(), 2);
        assert_eq!(subset.nfeatures(), 2);
    }

    #[test]
    fn from_pair_works() {
        let dataset: Dataset<f64> = (array![[1.0], [2.0]], array![0.5, 1.5]).into();
        assert_eq!(dataset.nsamples(), 2);
        assert_eq!(dataset.nfeatures(), 1);
    }
}
