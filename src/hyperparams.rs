//! Hyper-parameter sets for single fits, path fits, cross-validation and
//! grid search
//!
//! Every layer follows the same pattern: a builder (`…Params`) wrapping a
//! verified set (`…ValidParams`). Builders are checked through
//! [`ParamGuard`](crate::ParamGuard), either explicitly with `check()` or
//! implicitly when `fit()` is called on the unchecked set.

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::Float;
use crate::error::{PathwiseError, Result};
use crate::metrics::Loss;
use crate::param_guard::ParamGuard;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// Rule used to pick a penalty from a cross-validated path.
///
/// `Minimum` takes the penalty with the smallest mean held-out loss.
/// `OneStandardError` takes the largest penalty whose mean loss stays within
/// one standard error of that minimum, trading a little loss for a sparser,
/// more regularized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Minimum,
    OneStandardError,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Minimum
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// A verified hyper-parameter set ready for the estimation of a single
/// elastic net model
///
/// See [`ElasticNetParams`](crate::ElasticNetParams) for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct ElasticNetValidParams<F> {
    pub(crate) penalty: F,
    pub(crate) l1_ratio: F,
    pub(crate) with_intercept: bool,
    pub(crate) standardize: bool,
    pub(crate) max_iterations: u32,
    pub(crate) tolerance: F,
}

impl<F: Float> ElasticNetValidParams<F> {
    pub fn penalty(&self) -> F {
        self.penalty
    }

    pub fn l1_ratio(&self) -> F {
        self.l1_ratio
    }

    pub fn with_intercept(&self) -> bool {
        self.with_intercept
    }

    pub fn standardize(&self) -> bool {
        self.standardize
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }
}

/// A hyper-parameter set for a single elastic net fit
///
/// Configures and minimizes the following objective function:
/// ```ignore
/// 1 / (2 * n_samples) * ||y - Xw||^2_2
///     + penalty * l1_ratio * ||w||_1
///     + 0.5 * penalty * (1 - l1_ratio) * ||w||^2_2
/// ```
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :--- | :--- |
/// | [penalty](Self::penalty) | `1.0` | Overall penalty strength | `[0, inf)` |
/// | [l1_ratio](Self::l1_ratio) | `0.5` | Distribution of penalty between L1 and L2 | `[0, 1]` |
/// | [with_intercept](Self::with_intercept) | `true` | Enable intercept | `false`, `true` |
/// | [standardize](Self::standardize) | `true` | Scale columns to unit variance internally | `false`, `true` |
/// | [tolerance](Self::tolerance) | `1e-7` | Relative change of parameters to keep iterating | `(0, inf)` |
/// | [max_iterations](Self::max_iterations) | `1000` | Maximum number of descent passes | `[1, inf)` |
#[derive(Clone, Debug, PartialEq)]
pub struct ElasticNetParams<F>(pub(crate) ElasticNetValidParams<F>);

impl<F: Float> Default for ElasticNetParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ElasticNetParams<F> {
    /// Create default elastic net hyper parameters
    ///
    /// By default, an intercept is fitted and the columns of the design
    /// matrix are standardized internally, so the penalty treats features
    /// comparably regardless of their native scale. Reported coefficients
    /// are always on the original scale.
    pub fn new() -> ElasticNetParams<F> {
        Self(ElasticNetValidParams {
            penalty: F::one(),
            l1_ratio: F::cast(0.5),
            with_intercept: true,
            standardize: true,
            max_iterations: 1000,
            tolerance: F::cast(1e-7),
        })
    }

    /// Set the overall penalty strength of the fit.
    /// Use `l1_ratio` to configure how the penalty is distributed between L1
    /// and L2 regularization.
    pub fn penalty(mut self, penalty: F) -> Self {
        self.0.penalty = penalty;
        self
    }

    /// Set the l1 ratio. Setting `l1_ratio` to 1.0 is equivalent to a
    /// "Lasso" penalization, setting it to 0.0 to a "Ridge" penalization.
    ///
    /// `l1_ratio` must be between `0.0` and `1.0`.
    pub fn l1_ratio(mut self, l1_ratio: F) -> Self {
        self.0.l1_ratio = l1_ratio;
        self
    }

    /// Configure whether an intercept is fitted. Defaults to `true`.
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.0.with_intercept = with_intercept;
        self
    }

    /// Configure internal standardization of the design matrix.
    /// Defaults to `true`.
    pub fn standardize(mut self, standardize: bool) -> Self {
        self.0.standardize = standardize;
        self
    }

    /// Set the relative change in any model parameter below which a descent
    /// pass counts as stable. Defaults to `1e-7`.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Set the maximum number of descent passes. Defaults to `1000`.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }
}

impl<F: Float> ParamGuard for ElasticNetParams<F> {
    type Checked = ElasticNetValidParams<F>;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.penalty < F::zero() || !self.0.penalty.is_finite() {
            Err(PathwiseError::InvalidPenalty(
                self.0.penalty.to_f32().unwrap(),
            ))
        } else {
            check_mix_and_tolerance(self.0.l1_ratio, self.0.tolerance)?;
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// A verified hyper-parameter set ready for the estimation of a
/// regularization path
///
/// See [`PathParams`](crate::PathParams) for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct PathValidParams<F> {
    pub(crate) l1_ratio: F,
    pub(crate) with_intercept: bool,
    pub(crate) standardize: bool,
    pub(crate) max_iterations: u32,
    pub(crate) tolerance: F,
    pub(crate) n_penalties: usize,
    pub(crate) penalty_ratio: Option<F>,
    pub(crate) penalties: Option<Vec<F>>,
}

impl<F: Float> PathValidParams<F> {
    pub fn l1_ratio(&self) -> F {
        self.l1_ratio
    }

    pub fn with_intercept(&self) -> bool {
        self.with_intercept
    }

    pub fn standardize(&self) -> bool {
        self.standardize
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn n_penalties(&self) -> usize {
        self.n_penalties
    }

    pub fn penalty_ratio(&self) -> Option<F> {
        self.penalty_ratio
    }

    pub fn penalties(&self) -> Option<&[F]> {
        self.penalties.as_deref()
    }
}

/// A hyper-parameter set for a warm-started fit over a descending penalty
/// sequence
///
/// The sequence is derived from the data unless supplied explicitly: the
/// largest value is the smallest penalty driving every coefficient to zero,
/// the smallest is a configured fraction of it, and the values in between
/// are log-spaced.
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :--- | :--- |
/// | [l1_ratio](Self::l1_ratio) | `0.5` | Distribution of penalty between L1 and L2 | `[0, 1]` |
/// | [n_penalties](Self::n_penalties) | `100` | Length of the derived sequence | `[1, inf)` |
/// | [penalty_ratio](Self::penalty_ratio) | data-driven | Smallest penalty as a fraction of the largest | `(0, 1)` |
/// | [penalties](Self::penalties) | derived | Explicit descending sequence | non-negative |
///
/// The remaining knobs (`with_intercept`, `standardize`, `tolerance`,
/// `max_iterations`) match [`ElasticNetParams`](crate::ElasticNetParams).
/// When `penalty_ratio` is left unset it defaults to `1e-4` with more
/// samples than features and `1e-2` otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct PathParams<F>(pub(crate) PathValidParams<F>);

impl<F: Float> Default for PathParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> PathParams<F> {
    pub fn new() -> PathParams<F> {
        Self(PathValidParams {
            l1_ratio: F::cast(0.5),
            with_intercept: true,
            standardize: true,
            max_iterations: 1000,
            tolerance: F::cast(1e-7),
            n_penalties: 100,
            penalty_ratio: None,
            penalties: None,
        })
    }

    /// Set the l1 ratio shared by every point of the path.
    pub fn l1_ratio(mut self, l1_ratio: F) -> Self {
        self.0.l1_ratio = l1_ratio;
        self
    }

    /// Configure whether an intercept is fitted. Defaults to `true`.
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.0.with_intercept = with_intercept;
        self
    }

    /// Configure internal standardization of the design matrix.
    /// Defaults to `true`.
    pub fn standardize(mut self, standardize: bool) -> Self {
        self.0.standardize = standardize;
        self
    }

    /// Set the relative parameter change below which a descent pass counts
    /// as stable. Defaults to `1e-7`.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Set the maximum number of descent passes per penalty.
    /// Defaults to `1000`.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }

    /// Set the number of penalties in the derived sequence.
    /// Defaults to `100`. Ignored when an explicit sequence is supplied.
    pub fn n_penalties(mut self, n_penalties: usize) -> Self {
        self.0.n_penalties = n_penalties;
        self
    }

    /// Set the ratio between the smallest and the largest derived penalty.
    /// Ignored when an explicit sequence is supplied.
    pub fn penalty_ratio(mut self, penalty_ratio: F) -> Self {
        self.0.penalty_ratio = Some(penalty_ratio);
        self
    }

    /// Supply the penalty sequence explicitly instead of deriving it.
    /// The values must be finite, non-negative and strictly descending.
    pub fn penalties(mut self, penalties: Vec<F>) -> Self {
        self.0.penalties = Some(penalties);
        self
    }
}

impl<F: Float> ParamGuard for PathParams<F> {
    type Checked = PathValidParams<F>;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_path(&self.0)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// A verified hyper-parameter set ready for cross-validated path estimation
///
/// See [`CvParams`](crate::CvParams) for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct CvValidParams<F> {
    pub(crate) path: PathValidParams<F>,
    pub(crate) nfolds: usize,
    pub(crate) seed: u64,
    pub(crate) stratify: Option<usize>,
    pub(crate) loss: Loss,
}

impl<F: Float> CvValidParams<F> {
    pub fn path(&self) -> &PathValidParams<F> {
        &self.path
    }

    pub fn nfolds(&self) -> usize {
        self.nfolds
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stratify(&self) -> Option<usize> {
        self.stratify
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }
}

/// A hyper-parameter set for k-fold cross-validation over a penalty path
///
/// Rows are dealt into `nfolds` folds by a seeded shuffle, optionally
/// stratified by quantile-binning the targets. The penalty sequence is
/// derived once from the full dataset and shared across folds, so held-out
/// losses are comparable per penalty.
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :--- | :--- |
/// | [nfolds](Self::nfolds) | `10` | Number of folds | `[2, n_samples]` |
/// | [seed](Self::seed) | `42` | Seed of the fold shuffle | any |
/// | [stratify](Self::stratify) | off | Number of target quantile bins | `[2, inf)` |
/// | [loss](Self::loss) | MSE | Held-out loss measure | see [`Loss`](crate::Loss) |
///
/// Path and solver knobs are forwarded to [`PathParams`](crate::PathParams).
#[derive(Clone, Debug, PartialEq)]
pub struct CvParams<F>(pub(crate) CvValidParams<F>);

impl<F: Float> Default for CvParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> CvParams<F> {
    pub fn new() -> CvParams<F> {
        Self(CvValidParams {
            path: PathParams::new().0,
            nfolds: 10,
            seed: 42,
            stratify: None,
            loss: Loss::default(),
        })
    }

    /// Set the l1 ratio shared by every point of the path.
    pub fn l1_ratio(mut self, l1_ratio: F) -> Self {
        self.0.path.l1_ratio = l1_ratio;
        self
    }

    /// Configure whether an intercept is fitted. Defaults to `true`.
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.0.path.with_intercept = with_intercept;
        self
    }

    /// Configure internal standardization of the design matrix.
    /// Defaults to `true`.
    pub fn standardize(mut self, standardize: bool) -> Self {
        self.0.path.standardize = standardize;
        self
    }

    /// Set the relative parameter change below which a descent pass counts
    /// as stable. Defaults to `1e-7`.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.path.tolerance = tolerance;
        self
    }

    /// Set the maximum number of descent passes per penalty.
    /// Defaults to `1000`.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.path.max_iterations = max_iterations;
        self
    }

    /// Set the number of penalties in the derived sequence.
    /// Defaults to `100`.
    pub fn n_penalties(mut self, n_penalties: usize) -> Self {
        self.0.path.n_penalties = n_penalties;
        self
    }

    /// Set the ratio between the smallest and the largest derived penalty.
    pub fn penalty_ratio(mut self, penalty_ratio: F) -> Self {
        self.0.path.penalty_ratio = Some(penalty_ratio);
        self
    }

    /// Supply the penalty sequence explicitly instead of deriving it.
    pub fn penalties(mut self, penalties: Vec<F>) -> Self {
        self.0.path.penalties = Some(penalties);
        self
    }

    /// Set the number of folds. Defaults to `10`.
    pub fn nfolds(mut self, nfolds: usize) -> Self {
        self.0.nfolds = nfolds;
        self
    }

    /// Set the seed governing fold assignment. Defaults to `42`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }

    /// Stratify fold assignment by binning the targets into `bins` quantile
    /// strata. Off by default.
    pub fn stratify(mut self, bins: usize) -> Self {
        self.0.stratify = Some(bins);
        self
    }

    /// Set the held-out loss measure. Defaults to mean squared error.
    pub fn loss(mut self, loss: Loss) -> Self {
        self.0.loss = loss;
        self
    }
}

impl<F: Float> ParamGuard for CvParams<F> {
    type Checked = CvValidParams<F>;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_cv(&self.0)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// A verified hyper-parameter set ready for a grid search over the l1 ratio
///
/// See [`GridSearchParams`](crate::GridSearchParams) for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSearchValidParams<F> {
    pub(crate) cv: CvValidParams<F>,
    pub(crate) l1_ratios: Vec<F>,
    pub(crate) selection: Selection,
}

impl<F: Float> GridSearchValidParams<F> {
    pub fn cv(&self) -> &CvValidParams<F> {
        &self.cv
    }

    pub fn l1_ratios(&self) -> &[F] {
        &self.l1_ratios
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }
}

/// A hyper-parameter set sweeping the l1 ratio with one cross-validation
/// per candidate
///
/// Every candidate is cross-validated with the same fold seed, so the folds
/// are identical across the sweep and cells differ only in the mixing ratio.
/// The winning cell is the one with the smallest mean held-out loss; within
/// it, the reported model is picked by the configured [`Selection`] rule and
/// refit on the full dataset.
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :--- | :--- |
/// | [l1_ratios](Self::l1_ratios) | 11 values over `[0, 1]` | Candidate mixing ratios | each in `[0, 1]` |
/// | [selection](Self::selection) | `Minimum` | Penalty choice within the winning cell | see [`Selection`] |
///
/// Cross-validation and path knobs are forwarded to
/// [`CvParams`](crate::CvParams).
#[derive(Clone, Debug, PartialEq)]
pub struct GridSearchParams<F>(pub(crate) GridSearchValidParams<F>);

impl<F: Float> Default for GridSearchParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> GridSearchParams<F> {
    pub fn new() -> GridSearchParams<F> {
        Self(GridSearchValidParams {
            cv: CvParams::new().0,
            l1_ratios: (0..=10).map(|i| F::cast(i) / F::cast(10)).collect(),
            selection: Selection::default(),
        })
    }

    /// Set the candidate mixing ratios. Defaults to 11 evenly spaced values
    /// over `[0, 1]`.
    pub fn l1_ratios(mut self, l1_ratios: Vec<F>) -> Self {
        self.0.l1_ratios = l1_ratios;
        self
    }

    /// Set the rule picking the penalty within the winning cell.
    /// Defaults to [`Selection::Minimum`].
    pub fn selection(mut self, selection: Selection) -> Self {
        self.0.selection = selection;
        self
    }

    /// Configure whether an intercept is fitted. Defaults to `true`.
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.0.cv.path.with_intercept = with_intercept;
        self
    }

    /// Configure internal standardization of the design matrix.
    /// Defaults to `true`.
    pub fn standardize(mut self, standardize: bool) -> Self {
        self.0.cv.path.standardize = standardize;
        self
    }

    /// Set the relative parameter change below which a descent pass counts
    /// as stable. Defaults to `1e-7`.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.cv.path.tolerance = tolerance;
        self
    }

    /// Set the maximum number of descent passes per penalty.
    /// Defaults to `1000`.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.cv.path.max_iterations = max_iterations;
        self
    }

    /// Set the number of penalties in each cell's derived sequence.
    /// Defaults to `100`.
    pub fn n_penalties(mut self, n_penalties: usize) -> Self {
        self.0.cv.path.n_penalties = n_penalties;
        self
    }

    /// Set the ratio between the smallest and the largest derived penalty.
    pub fn penalty_ratio(mut self, penalty_ratio: F) -> Self {
        self.0.cv.path.penalty_ratio = Some(penalty_ratio);
        self
    }

    /// Supply the penalty sequence shared by every cell explicitly.
    pub fn penalties(mut self, penalties: Vec<F>) -> Self {
        self.0.cv.path.penalties = Some(penalties);
        self
    }

    /// Set the number of folds. Defaults to `10`.
    pub fn nfolds(mut self, nfolds: usize) -> Self {
        self.0.cv.nfolds = nfolds;
        self
    }

    /// Set the seed governing fold assignment. Defaults to `42`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.cv.seed = seed;
        self
    }

    /// Stratify fold assignment by binning the targets into `bins` quantile
    /// strata. Off by default.
    pub fn stratify(mut self, bins: usize) -> Self {
        self.0.cv.stratify = Some(bins);
        self
    }

    /// Set the held-out loss measure. Defaults to mean squared error.
    pub fn loss(mut self, loss: Loss) -> Self {
        self.0.cv.loss = loss;
        self
    }
}

impl<F: Float> ParamGuard for GridSearchParams<F> {
    type Checked = GridSearchValidParams<F>;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_cv(&self.0.cv)?;
        if self.0.l1_ratios.is_empty() {
            return Err(PathwiseError::EmptyGrid);
        }
        for ratio in &self.0.l1_ratios {
            if !(F::zero()..=F::one()).contains(ratio) {
                return Err(PathwiseError::InvalidL1Ratio(ratio.to_f32().unwrap()));
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

fn check_mix_and_tolerance<F: Float>(l1_ratio: F, tolerance: F) -> Result<()> {
    if !(F::zero()..=F::one()).contains(&l1_ratio) {
        Err(PathwiseError::InvalidL1Ratio(l1_ratio.to_f32().unwrap()))
    } else if tolerance <= F::zero() || !tolerance.is_finite() {
        Err(PathwiseError::InvalidTolerance(tolerance.to_f32().unwrap()))
    } else {
        Ok(())
    }
}

fn check_path<F: Float>(params: &PathValidParams<F>) -> Result<()> {
    check_mix_and_tolerance(params.l1_ratio, params.tolerance)?;
    if params.n_penalties == 0 {
        return Err(PathwiseError::InvalidPenaltyCount(0));
    }
    if let Some(ratio) = params.penalty_ratio {
        if ratio <= F::zero() || ratio >= F::one() {
            return Err(PathwiseError::InvalidPenaltyRatio(ratio.to_f32().unwrap()));
        }
    }
    if let Some(penalties) = &params.penalties {
        if penalties.is_empty() {
            return Err(PathwiseError::InvalidPenaltyCount(0));
        }
        let descending = penalties.windows(2).all(|pair| pair[0] > pair[1]);
        let admissible = penalties
            .iter()
            .all(|p| p.is_finite() && *p >= F::zero());
        if !descending || !admissible {
            return Err(PathwiseError::UnsortedPenalties);
        }
    }
    Ok(())
}

fn check_cv<F: Float>(params: &CvValidParams<F>) -> Result<()> {
    check_path(&params.path)?;
    if params.nfolds < 2 {
        return Err(PathwiseError::InvalidFoldCount(params.nfolds));
    }
    if let Some(bins) = params.stratify {
        if bins < 2 {
            return Err(PathwiseError::InvalidStrataCount(bins));
        }
    }
    Ok(())
}
