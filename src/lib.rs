//! # Regularization paths with cross-validated selection
//!
//! `pathwise` fits elastic net regression models — ridge, lasso and every
//! mix in between — across a descending penalty sequence, and selects the
//! penalty and the mixing ratio by k-fold cross-validation.
//!
//! ## Model implementation
//!
//! The cyclical coordinate descent algorithm is used to solve the penalized
//! least squares problem at every point of the path. It optimizes each
//! parameter separately, holding all the others fixed, and cycles until the
//! coefficients have stabilized or the maximum number of iterations is
//! reached. Each penalty is solved starting from the previous solution, so
//! the whole path costs little more than a single cold fit.
//!
//! See also:
//! * [Talk on Fast Regularization Paths](https://web.stanford.edu/~hastie/TALKS/glmnet.pdf)
//! * [Regularization Paths for Generalized Linear Models via Coordinate
//!   Descent](http://www.jstatsoft.org/v33/i01/paper)
//!
//! ## Layers
//!
//! * [`ElasticNet`] — one fit at a fixed penalty
//! * [`ElasticNetPath`] — warm-started fits over a penalty sequence
//! * [`ElasticNetCv`] — cross-validated loss per penalty, with the
//!   `minimum` and `one standard error` choices
//! * [`ElasticNetSearch`] — a [`rayon`]-parallel sweep of the mixing ratio
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use pathwise::{Dataset, ElasticNet, Fit, Predict};
//!
//! let dataset = Dataset::new(
//!     array![[0.0], [1.0], [2.0]],
//!     array![1.0f64, 2.0, 3.0],
//! );
//!
//! let model = ElasticNet::lasso().penalty(1e-4).fit(&dataset)?;
//! let prediction = model.predict(&array![[3.0]]);
//! assert!((prediction[0] - 4.0).abs() < 1e-2);
//! # Ok::<(), pathwise::PathwiseError>(())
//! ```

use ndarray::Array1;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

mod algorithm;
mod cross_validation;
mod dataset;
mod error;
mod grid_search;
mod hyperparams;
pub mod metrics;
mod param_guard;
mod path;
mod traits;

pub use crate::cross_validation::ElasticNetCv;
pub use crate::dataset::{Dataset, Float};
pub use crate::error::{PathwiseError, Result};
pub use crate::grid_search::{ElasticNetSearch, SearchCell};
pub use crate::hyperparams::{
    CvParams, CvValidParams, ElasticNetParams, ElasticNetValidParams, GridSearchParams,
    GridSearchValidParams, PathParams, PathValidParams, Selection,
};
pub use crate::metrics::Loss;
pub use crate::param_guard::ParamGuard;
pub use crate::path::{ElasticNetPath, NonConvergence};
pub use crate::traits::{Fit, Predict};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// Elastic net model
///
/// This struct contains the parameters of a fitted elastic net model: the
/// separating hyperplane, (optionally) an intercept, the duality gap reached
/// and the number of descent passes needed in the computation.
///
/// Coefficients are always reported on the original scale of the features,
/// even when the fit standardized them internally.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticNet<F> {
    pub(crate) hyperplane: Array1<F>,
    pub(crate) intercept: F,
    pub(crate) duality_gap: F,
    pub(crate) n_steps: u32,
    pub(crate) converged: bool,
}

impl<F: Float> ElasticNet<F> {
    /// Create a default parameter set for construction of an elastic net
    /// model
    ///
    /// By default, an intercept is fitted and features are standardized
    /// internally. Call `.with_intercept(false)` or `.standardize(false)`
    /// before `.fit()` to disable either.
    pub fn params() -> ElasticNetParams<F> {
        ElasticNetParams::new()
    }

    /// Create a ridge only model
    pub fn ridge() -> ElasticNetParams<F> {
        ElasticNetParams::new().l1_ratio(F::zero())
    }

    /// Create a lasso only model
    pub fn lasso() -> ElasticNetParams<F> {
        ElasticNetParams::new().l1_ratio(F::one())
    }
}

/// View the fitted parameters of an elastic net model
impl<F: Float> ElasticNet<F> {
    /// Get the fitted hyperplane
    pub fn parameters(&self) -> &Array1<F> {
        &self.hyperplane
    }

    /// Get the fitted intercept, 0. if no intercept was fitted
    pub fn intercept(&self) -> F {
        self.intercept
    }

    /// Get the number of descent passes taken
    pub fn n_steps(&self) -> u32 {
        self.n_steps
    }

    /// Get the duality gap at the end of the optimization
    pub fn duality_gap(&self) -> F {
        self.duality_gap
    }

    /// Whether the optimization met its tolerance within the allowed passes
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Number of coefficients different from zero
    pub fn nonzero_count(&self) -> usize {
        self.hyperplane.iter().filter(|w| **w != F::zero()).count()
    }
}
