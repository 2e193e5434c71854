//! Cross-validated loss over a penalty path
//!
//! Rows are dealt into folds by a seeded shuffle, each fold is held out in
//! turn while a path is fitted on the rest, and the held-out losses are
//! aggregated into a mean and standard error per penalty. The penalty
//! sequence is derived once from the full dataset, so losses line up across
//! folds.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::algorithm::preprocess;
use crate::dataset::{Dataset, Float};
use crate::error::{PathwiseError, Result};
use crate::hyperparams::{CvParams, CvValidParams, PathValidParams, Selection};
use crate::metrics::Loss;
use crate::path::{derive_penalties, default_penalty_ratio, ElasticNetPath};
use crate::traits::{Fit, Predict};
use crate::ElasticNet;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// Cross-validated elastic net path
///
/// Besides the per-penalty loss table this struct carries the two canonical
/// penalty choices: the loss minimizer and the largest penalty within one
/// standard error of it. Ties on the mean loss resolve to the larger
/// penalty. A path refit on the full dataset is included, so either choice
/// can be turned into a usable model without touching the data again.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticNetCv<F> {
    pub(crate) penalties: Array1<F>,
    pub(crate) fold_loss: Array2<F>,
    pub(crate) mean_loss: Array1<F>,
    pub(crate) se_loss: Array1<F>,
    pub(crate) idx_min: usize,
    pub(crate) idx_1se: usize,
    pub(crate) loss: Loss,
    pub(crate) path: ElasticNetPath<F>,
}

impl<F: Float> ElasticNetCv<F> {
    /// Create a default parameter set for cross-validated path estimation
    pub fn params() -> CvParams<F> {
        CvParams::new()
    }

    /// The penalty sequence, largest first
    pub fn penalties(&self) -> &Array1<F> {
        &self.penalties
    }

    /// Held-out loss per `(fold, penalty)`
    pub fn fold_loss(&self) -> &Array2<F> {
        &self.fold_loss
    }

    /// Mean held-out loss per penalty
    pub fn mean_loss(&self) -> &Array1<F> {
        &self.mean_loss
    }

    /// Standard error of the held-out loss per penalty
    pub fn se_loss(&self) -> &Array1<F> {
        &self.se_loss
    }

    /// Position of the loss-minimizing penalty in the path
    pub fn index_min(&self) -> usize {
        self.idx_min
    }

    /// Position of the one-standard-error penalty in the path
    pub fn index_1se(&self) -> usize {
        self.idx_1se
    }

    /// The penalty minimizing mean held-out loss
    pub fn penalty_min(&self) -> F {
        self.penalties[self.idx_min]
    }

    /// The largest penalty whose mean loss stays within one standard error
    /// of the minimum; never smaller than [`penalty_min`](Self::penalty_min)
    pub fn penalty_1se(&self) -> F {
        self.penalties[self.idx_1se]
    }

    /// The loss measure the folds were scored with
    pub fn loss(&self) -> Loss {
        self.loss
    }

    /// The path refit on the full dataset
    pub fn path(&self) -> &ElasticNetPath<F> {
        &self.path
    }

    /// Full-data model at the loss-minimizing penalty
    pub fn model_min(&self) -> ElasticNet<F> {
        self.path.model_at(self.idx_min)
    }

    /// Full-data model at the one-standard-error penalty
    pub fn model_1se(&self) -> ElasticNet<F> {
        self.path.model_at(self.idx_1se)
    }

    /// Full-data model at the penalty picked by `selection`
    pub fn select(&self, selection: Selection) -> ElasticNet<F> {
        match selection {
            Selection::Minimum => self.model_min(),
            Selection::OneStandardError => self.model_1se(),
        }
    }
}

impl<F: Float> Fit<F> for CvValidParams<F> {
    type Object = ElasticNetCv<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<ElasticNetCv<F>> {
        let n = dataset.nsamples();
        if dataset.targets().len() != n {
            return Err(PathwiseError::ShapeMismatch {
                rows: n,
                targets: dataset.targets().len(),
            });
        }
        if self.nfolds() < 2 || self.nfolds() > n {
            return Err(PathwiseError::InvalidFoldCount(self.nfolds()));
        }
        if self.loss() == Loss::Deviance {
            let targets = dataset.targets();
            if targets.iter().all(|t| *t == targets[0]) {
                return Err(PathwiseError::DegenerateTargets);
            }
        }

        // one penalty sequence for every fold, derived from the full data
        let penalties: Vec<F> = match self.path().penalties() {
            Some(explicit) => explicit.to_vec(),
            None => {
                let prep = preprocess(
                    dataset.records(),
                    dataset.targets(),
                    self.path().with_intercept(),
                    self.path().standardize(),
                )?;
                let ratio = self.path().penalty_ratio().unwrap_or_else(|| {
                    default_penalty_ratio(dataset.nsamples(), dataset.nfeatures())
                });
                derive_penalties(
                    prep.x.view(),
                    prep.y.view(),
                    self.path().l1_ratio(),
                    self.path().n_penalties(),
                    ratio,
                )
            }
        };
        let fold_params = PathValidParams {
            penalties: Some(penalties.clone()),
            ..self.path().clone()
        };

        let folds = match self.stratify() {
            Some(bins) => stratified_folds(dataset.targets(), self.nfolds(), bins, self.seed())?,
            None => k_folds(n, self.nfolds(), self.seed()),
        };

        let loss = self.loss();
        let rows: Vec<Array1<F>> = folds
            .par_iter()
            .map(|held_out| {
                let mut in_training = vec![true; n];
                for &row in held_out {
                    in_training[row] = false;
                }
                let train_rows: Vec<usize> = (0..n).filter(|row| in_training[*row]).collect();

                let fitted = fold_params.fit(&dataset.select(&train_rows))?;
                let validation = dataset.select(held_out);
                let records = validation.records();
                let predictions = fitted.predict(&records);

                Ok((0..penalties.len())
                    .map(|l| loss.evaluate(predictions.column(l), validation.targets()))
                    .collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fold_loss = Array2::zeros((self.nfolds(), penalties.len()));
        for (i, row) in rows.iter().enumerate() {
            fold_loss.row_mut(i).assign(row);
        }
        let mean_loss = fold_loss.mean_axis(Axis(0)).unwrap();
        let folds_f = F::cast(self.nfolds());
        let se_loss: Array1<F> = (0..penalties.len())
            .map(|l| {
                let mean = mean_loss[l];
                let variance = fold_loss
                    .column(l)
                    .iter()
                    .map(|v| (*v - mean) * (*v - mean))
                    .sum::<F>()
                    / F::cast(self.nfolds() - 1);
                (variance / folds_f).sqrt()
            })
            .collect();

        // the path descends and comparisons are strict, so ties on the mean
        // loss land on the larger penalty
        let mut idx_min = 0;
        for l in 1..penalties.len() {
            if mean_loss[l] < mean_loss[idx_min] {
                idx_min = l;
            }
        }
        let threshold = mean_loss[idx_min] + se_loss[idx_min];
        let mut idx_1se = idx_min;
        for (l, mean) in mean_loss.iter().enumerate().take(idx_min + 1) {
            if *mean <= threshold {
                idx_1se = l;
                break;
            }
        }

        let path = fold_params.fit(dataset)?;

        Ok(ElasticNetCv {
            penalties: Array1::from(penalties),
            fold_loss,
            mean_loss,
            se_loss,
            idx_min,
            idx_1se,
            loss,
            path,
        })
    }
}

/// Deal `n` shuffled row indices into `k` folds differing in size by at
/// most one.
pub(crate) fn k_folds(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut Xoshiro256Plus::seed_from_u64(seed));

    let mut folds = vec![Vec::with_capacity(n / k + 1); k];
    for (position, index) in indices.into_iter().enumerate() {
        folds[position % k].push(index);
    }
    folds
}

/// Deal row indices into `k` folds stratum by stratum, where the strata are
/// contiguous quantile bins of the sorted targets.
///
/// Every stratum must hold at least `k` rows; the deal start rotates per
/// stratum so no fold systematically collects the remainders.
pub(crate) fn stratified_folds<F: Float>(
    targets: ArrayView1<F>,
    k: usize,
    bins: usize,
    seed: u64,
) -> Result<Vec<Vec<usize>>> {
    let n = targets.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        targets[a]
            .partial_cmp(&targets[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let stratum_size = (n + bins - 1) / bins;
    for (stratum, chunk) in order.chunks(stratum_size).enumerate() {
        if chunk.len() < k {
            return Err(PathwiseError::StratumTooSmall {
                stratum,
                size: chunk.len(),
                folds: k,
            });
        }
        let mut members = chunk.to_vec();
        members.shuffle(&mut rng);
        for (position, index) in members.into_iter().enumerate() {
            folds[(position + stratum) % k].push(index);
        }
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s, Array, Array1};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    use num_traits::Float;

    use super::{k_folds, stratified_folds};
    use crate::error::PathwiseError;
    use crate::traits::Fit;
    use crate::{Dataset, ElasticNet, ElasticNetCv, Loss};

    fn sparse_regression_dataset() -> Dataset<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);

        let mut w = Array1::zeros(20);
        w.slice_mut(s![..5])
            .assign(&Array::random_using(5, Uniform::new(1.0, 2.0), &mut rng));

        let x = Array::random_using((100, 20), Uniform::new(-1.0, 1.0), &mut rng);
        let y = x.dot(&w);
        Dataset::new(x, y)
    }

    fn assert_partition(folds: &[Vec<usize>], n: usize) {
        let mut seen = vec![false; n];
        for fold in folds {
            for &index in fold {
                assert!(!seen[index], "index {} dealt twice", index);
                seen[index] = true;
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn folds_partition_the_rows_deterministically() {
        let folds = k_folds(10, 3, 7);
        assert_partition(&folds, 10);

        let mut sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![3, 3, 4]);

        assert_eq!(folds, k_folds(10, 3, 7));
        assert_ne!(folds, k_folds(10, 3, 8));
    }

    #[test]
    fn stratified_folds_partition_the_rows() {
        let targets: Array1<f64> = (0..24).map(|i| i as f64).collect();
        let folds = stratified_folds(targets.view(), 3, 4, 1).unwrap();

        assert_partition(&folds, 24);
        for fold in &folds {
            assert_eq!(fold.len(), 8);
        }
    }

    #[test]
    fn small_stratum_is_a_configuration_error() {
        let targets: Array1<f64> = (0..10).map(|i| i as f64).collect();
        let err = stratified_folds(targets.view(), 4, 5, 1).unwrap_err();
        assert_eq!(
            err,
            PathwiseError::StratumTooSmall {
                stratum: 0,
                size: 2,
                folds: 4
            }
        );
    }

    #[test]
    fn more_folds_than_samples_fail() {
        let dataset = Dataset::new(
            array![[1.0], [2.0], [3.0], [4.0]],
            array![1.0, 2.0, 3.0, 4.0],
        );

        let err = ElasticNetCv::params().fit(&dataset).unwrap_err();
        assert_eq!(err, PathwiseError::InvalidFoldCount(10));
    }

    #[test]
    fn deviance_needs_two_distinct_targets() {
        let dataset = Dataset::new(
            array![[1.0], [2.0], [3.0], [4.0]],
            array![1.0, 1.0, 1.0, 1.0],
        );

        let err = ElasticNetCv::params()
            .nfolds(2)
            .loss(Loss::Deviance)
            .fit(&dataset)
            .unwrap_err();
        assert_eq!(err, PathwiseError::DegenerateTargets);
    }

    #[test]
    fn identical_seeds_give_identical_results() {
        let dataset = sparse_regression_dataset();

        let params = ElasticNetCv::params()
            .l1_ratio(1.0)
            .nfolds(5)
            .n_penalties(30)
            .seed(3);
        let first = params.clone().fit(&dataset).unwrap();
        let second = params.fit(&dataset).unwrap();

        assert_eq!(first.penalty_min(), second.penalty_min());
        assert_eq!(first.penalty_1se(), second.penalty_1se());
        assert_eq!(first.mean_loss(), second.mean_loss());
    }

    #[test]
    fn one_standard_error_choice_is_more_regularized() {
        let mut rng = Xoshiro256Plus::seed_from_u64(11);
        let x = Array::random_using((40, 5), Uniform::new(-1.0, 1.0), &mut rng);
        let noise = Array::random_using(40, Uniform::new(-0.5, 0.5), &mut rng);
        let y = 2.0 * &x.column(0) - &x.column(1) + &noise;
        let dataset = Dataset::new(x, y);

        let cv = ElasticNetCv::params()
            .nfolds(5)
            .n_penalties(40)
            .fit(&dataset)
            .unwrap();

        assert!(cv.penalty_1se() >= cv.penalty_min());
        assert!(cv.index_1se() <= cv.index_min());
        assert!(cv.mean_loss().iter().all(|l| l.is_finite()));
        assert_eq!(cv.fold_loss().dim(), (5, 40));
    }

    #[test]
    fn lasso_cross_validation_recovers_the_sparse_signal() {
        let dataset = sparse_regression_dataset();

        let cv = ElasticNetCv::params()
            .l1_ratio(1.0)
            .nfolds(5)
            .n_penalties(50)
            .penalty_ratio(0.01)
            .tolerance(1e-9)
            .fit(&dataset)
            .unwrap();

        // the chosen fit keeps the informative features and admits at most
        // a handful of noise ones
        let support = cv.model_min().nonzero_count();
        assert!((5..=15).contains(&support), "support was {}", support);

        // ten times the chosen penalty prunes down to the true support or
        // below
        let stricter = ElasticNet::lasso()
            .penalty(10.0 * cv.penalty_min())
            .fit(&dataset)
            .unwrap();
        assert!(
            stricter.nonzero_count() <= 5,
            "support was {}",
            stricter.nonzero_count()
        );

        // the refit carried by the result agrees with a direct fit at the
        // chosen penalty
        let direct = ElasticNet::lasso()
            .penalty(cv.penalty_min())
            .tolerance(1e-9)
            .fit(&dataset)
            .unwrap();
        let model_min = cv.model_min();
        assert_abs_diff_eq!(
            model_min.parameters(),
            direct.parameters(),
            epsilon = 1e-4
        );
    }
}
