//! Held-out loss measures and evaluation helpers for regression

use ndarray::ArrayView1;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::Float;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// Loss recorded on held-out folds during cross-validation.
///
/// `Deviance` treats the targets as binary (0/1) outcomes and the predictions
/// as means, clamped away from 0 and 1 before taking logarithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    MeanSquaredError,
    MeanAbsoluteError,
    Deviance,
}

impl Default for Loss {
    fn default() -> Self {
        Loss::MeanSquaredError
    }
}

impl Loss {
    /// Evaluate predictions against observed targets.
    pub fn evaluate<F: Float>(&self, predictions: ArrayView1<F>, truth: ArrayView1<F>) -> F {
        match self {
            Loss::MeanSquaredError => mean_squared_error(predictions, truth),
            Loss::MeanAbsoluteError => mean_absolute_error(predictions, truth),
            Loss::Deviance => binomial_deviance(predictions, truth),
        }
    }
}

/// Mean squared error between two continuous variables
pub fn mean_squared_error<F: Float>(predictions: ArrayView1<F>, truth: ArrayView1<F>) -> F {
    let n = F::cast(truth.len());
    predictions
        .iter()
        .zip(truth.iter())
        .map(|(p, t)| (*p - *t) * (*p - *t))
        .sum::<F>()
        / n
}

/// Mean absolute error between two continuous variables
pub fn mean_absolute_error<F: Float>(predictions: ArrayView1<F>, truth: ArrayView1<F>) -> F {
    let n = F::cast(truth.len());
    predictions
        .iter()
        .zip(truth.iter())
        .map(|(p, t)| (*p - *t).abs())
        .sum::<F>()
        / n
}

/// Binomial deviance of mean predictions against 0/1 targets
pub fn binomial_deviance<F: Float>(predictions: ArrayView1<F>, truth: ArrayView1<F>) -> F {
    let eps = F::cast(1e-8);
    let n = F::cast(truth.len());
    let log_likelihood = predictions
        .iter()
        .zip(truth.iter())
        .map(|(p, y)| {
            let p = F::min(F::max(*p, eps), F::one() - eps);
            *y * p.ln() + (F::one() - *y) * (F::one() - p).ln()
        })
        .sum::<F>();
    -F::cast(2.0) * log_likelihood / n
}

/// R squared coefficient, the proportion of target variance explained by the
/// predictions
pub fn r2<F: Float>(predictions: ArrayView1<F>, truth: ArrayView1<F>) -> F {
    let mean = truth.iter().copied().sum::<F>() / F::cast(truth.len());
    let residual = predictions
        .iter()
        .zip(truth.iter())
        .map(|(p, t)| (*p - *t) * (*p - *t))
        .sum::<F>();
    let total = truth.iter().map(|t| (*t - mean) * (*t - mean)).sum::<F>();
    F::one() - residual / (total + F::cast(1e-10))
}
