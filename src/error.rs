#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use thiserror::Error;

/// Simplified `Result` using [`PathwiseError`](crate::PathwiseError) as error type
pub type Result<T> = std::result::Result<T, PathwiseError>;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathwiseError {
    #[error("l1 ratio should be in range [0, 1], but is {0}")]
    InvalidL1Ratio(f32),
    #[error("penalty should be non-negative and finite, but is {0}")]
    InvalidPenalty(f32),
    #[error("tolerance should be positive, but is {0}")]
    InvalidTolerance(f32),
    #[error("penalty path needs at least one value, but {0} were requested")]
    InvalidPenaltyCount(usize),
    #[error("penalty ratio should be in range (0, 1), but is {0}")]
    InvalidPenaltyRatio(f32),
    #[error("a supplied penalty path must be finite, non-negative and strictly descending")]
    UnsortedPenalties,
    #[error("cross validation needs at least 2 and at most `n_samples` folds, but {0} were requested")]
    InvalidFoldCount(usize),
    #[error("stratification needs at least 2 bins, but {0} were requested")]
    InvalidStrataCount(usize),
    #[error("stratum {stratum} holds {size} observations, fewer than the {folds} requested folds")]
    StratumTooSmall {
        stratum: usize,
        size: usize,
        folds: usize,
    },
    #[error("l1 ratio grid must hold at least one candidate")]
    EmptyGrid,
    #[error("column {0} has zero variance; drop or flag it before fitting")]
    DegenerateColumn(usize),
    #[error("deviance loss needs at least two distinct target values")]
    DegenerateTargets,
    #[error("at least 2 samples are needed for a fit, but {0} were supplied")]
    NotEnoughSamples(usize),
    #[error("records have {rows} rows, but {targets} targets were supplied")]
    ShapeMismatch { rows: usize, targets: usize },
}
