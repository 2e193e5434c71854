//! Warm-started fits across a descending penalty sequence

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::algorithm::{coordinate_descent, preprocess};
use crate::dataset::{Dataset, Float};
use crate::error::Result;
use crate::hyperparams::{PathParams, PathValidParams};
use crate::traits::{Fit, Predict};
use crate::ElasticNet;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// A descent run that exhausted its iteration budget before meeting the
/// tolerance at one point of the path.
///
/// Warm starts usually leave the reported coefficients usable regardless;
/// callers decide whether to accept them or refit with a larger budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NonConvergence<F> {
    pub(crate) index: usize,
    pub(crate) penalty: F,
    pub(crate) last_change: F,
}

impl<F: Float> NonConvergence<F> {
    /// Position of the affected penalty in the path
    pub fn index(&self) -> usize {
        self.index
    }

    /// The affected penalty value
    pub fn penalty(&self) -> F {
        self.penalty
    }

    /// Relative coefficient change of the last descent pass
    pub fn last_change(&self) -> F {
        self.last_change
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// Elastic net models along a descending penalty sequence
///
/// Each penalty is solved by coordinate descent starting from the previous
/// solution. Besides making the whole path barely more expensive than a
/// single cold fit, the warm starts keep the coefficient norms changing
/// smoothly in the penalty: the L2 norm of the hyperplane never grows as the
/// penalty does.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticNetPath<F> {
    pub(crate) penalties: Array1<F>,
    pub(crate) hyperplanes: Array2<F>,
    pub(crate) intercepts: Array1<F>,
    pub(crate) gaps: Array1<F>,
    pub(crate) n_steps: Array1<u32>,
    pub(crate) warnings: Vec<NonConvergence<F>>,
}

impl<F: Float> ElasticNetPath<F> {
    /// Create a default parameter set for the estimation of a path
    pub fn params() -> PathParams<F> {
        PathParams::new()
    }

    /// Create a ridge only path
    pub fn ridge() -> PathParams<F> {
        PathParams::new().l1_ratio(F::zero())
    }

    /// Create a lasso only path
    pub fn lasso() -> PathParams<F> {
        PathParams::new().l1_ratio(F::one())
    }

    /// The penalty sequence, largest first
    pub fn penalties(&self) -> &Array1<F> {
        &self.penalties
    }

    /// Fitted hyperplanes, one row per penalty, on the original feature
    /// scale
    pub fn hyperplanes(&self) -> &Array2<F> {
        &self.hyperplanes
    }

    /// Fitted intercepts, one per penalty
    pub fn intercepts(&self) -> &Array1<F> {
        &self.intercepts
    }

    /// Descent passes spent per penalty
    pub fn n_steps(&self) -> &Array1<u32> {
        &self.n_steps
    }

    /// Points of the path whose descent ran out of iterations
    pub fn warnings(&self) -> &[NonConvergence<F>] {
        &self.warnings
    }

    /// Number of penalties in the path
    pub fn len(&self) -> usize {
        self.penalties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.penalties.is_empty()
    }

    /// Number of nonzero coefficients per penalty
    pub fn nonzero_counts(&self) -> Array1<usize> {
        self.hyperplanes
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|w| **w != F::zero()).count())
            .collect()
    }

    /// Extract the model fitted at position `index` of the path.
    pub fn model_at(&self, index: usize) -> ElasticNet<F> {
        ElasticNet {
            hyperplane: self.hyperplanes.row(index).to_owned(),
            intercept: self.intercepts[index],
            duality_gap: self.gaps[index],
            n_steps: self.n_steps[index],
            converged: !self.warnings.iter().any(|w| w.index == index),
        }
    }
}

impl<F: Float, D: Data<Elem = F>> Predict<&ArrayBase<D, Ix2>, Array2<F>> for ElasticNetPath<F> {
    /// Predict targets for every point of the path at once, returning one
    /// column per penalty.
    fn predict(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        x.dot(&self.hyperplanes.t()) + &self.intercepts
    }
}

impl<F: Float> Fit<F> for PathValidParams<F> {
    type Object = ElasticNetPath<F>;

    /// Fit elastic net models over the whole penalty sequence, derived from
    /// the data unless supplied explicitly.
    fn fit(&self, dataset: &Dataset<F>) -> Result<ElasticNetPath<F>> {
        let prep = preprocess(
            dataset.records(),
            dataset.targets(),
            self.with_intercept(),
            self.standardize(),
        )?;
        let penalties: Vec<F> = match self.penalties() {
            Some(explicit) => explicit.to_vec(),
            None => {
                let ratio = self.penalty_ratio().unwrap_or_else(|| {
                    default_penalty_ratio(dataset.nsamples(), dataset.nfeatures())
                });
                derive_penalties(
                    prep.x.view(),
                    prep.y.view(),
                    self.l1_ratio(),
                    self.n_penalties(),
                    ratio,
                )
            }
        };

        let n_features = dataset.nfeatures();
        let mut beta = Array1::zeros(n_features);
        let mut hyperplanes = Array2::zeros((penalties.len(), n_features));
        let mut intercepts = Array1::zeros(penalties.len());
        let mut gaps = Array1::zeros(penalties.len());
        let mut n_steps = Array1::<u32>::zeros(penalties.len());
        let mut warnings = Vec::new();

        for (i, &penalty) in penalties.iter().enumerate() {
            let state = coordinate_descent(
                prep.x.view(),
                prep.y.view(),
                &mut beta,
                self.tolerance(),
                self.max_iterations(),
                self.l1_ratio(),
                penalty,
            );
            let model = prep.restore(beta.clone(), &state);
            hyperplanes.row_mut(i).assign(model.parameters());
            intercepts[i] = model.intercept();
            gaps[i] = state.gap;
            n_steps[i] = state.n_steps;
            if !state.converged {
                warnings.push(NonConvergence {
                    index: i,
                    penalty,
                    last_change: state.last_change,
                });
            }
        }

        Ok(ElasticNetPath {
            penalties: Array1::from(penalties),
            hyperplanes,
            intercepts,
            gaps,
            n_steps,
            warnings,
        })
    }
}

/// Smallest-to-largest span of the derived penalty sequence when the caller
/// left it open: conservative with more features than samples, tight
/// otherwise.
pub(crate) fn default_penalty_ratio<F: Float>(n_samples: usize, n_features: usize) -> F {
    if n_samples > n_features {
        F::cast(1e-4)
    } else {
        F::cast(1e-2)
    }
}

/// Derive the penalty sequence from the (standardized) problem.
///
/// The sequence is anchored at the smallest penalty driving every
/// coefficient to zero and descends log-spaced to `anchor * ratio`. A
/// ridge-leaning mix is floored in the anchor computation so the anchor
/// stays finite.
pub(crate) fn derive_penalties<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    l1_ratio: F,
    n_penalties: usize,
    ratio: F,
) -> Vec<F> {
    let n = F::cast(x.nrows());
    let mix = F::max(l1_ratio, F::cast(1e-3));
    let mut anchor = x
        .t()
        .dot(&y)
        .fold(F::zero(), |abs_max, &v| abs_max.max(v.abs()))
        / (n * mix);
    if !anchor.is_finite() || anchor <= F::zero() {
        // targets orthogonal to every column; any positive anchor gives an
        // all-zero path
        anchor = F::one();
    }
    if n_penalties == 1 {
        return vec![anchor];
    }
    let step = ratio.ln() / F::cast(n_penalties - 1);
    (0..n_penalties)
        .map(|i| anchor * (step * F::cast(i)).exp())
        .collect()
}
