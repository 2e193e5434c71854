//! Grid search over the mixing ratio, one cross-validation per candidate
//!
//! Every cell of the grid is an independent pure computation over the same
//! immutable dataset, so the sweep is embarrassingly parallel; cells are
//! dispatched through `rayon` and collected back in grid order, which keeps
//! reporting deterministic no matter how the work was scheduled.

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::cross_validation::ElasticNetCv;
use crate::dataset::{Dataset, Float};
use crate::error::Result;
use crate::hyperparams::{
    CvValidParams, GridSearchParams, GridSearchValidParams, PathValidParams, Selection,
};
use crate::traits::Fit;
use crate::ElasticNet;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// One cell of the mixing-ratio grid: a candidate ratio together with its
/// cross-validation result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCell<F> {
    pub(crate) l1_ratio: F,
    pub(crate) cv: ElasticNetCv<F>,
}

impl<F: Float> SearchCell<F> {
    /// The candidate mixing ratio of this cell
    pub fn l1_ratio(&self) -> F {
        self.l1_ratio
    }

    /// The cross-validation result of this cell
    pub fn cv(&self) -> &ElasticNetCv<F> {
        &self.cv
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
/// Result of a cross-validated sweep over the mixing ratio
///
/// Carries the full grid of per-cell loss tables for diagnostics, the
/// winning `(l1_ratio, penalty)` pair and a model refit on the full dataset
/// at that pair. Ties between cells resolve to the earlier ratio in the
/// grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticNetSearch<F> {
    pub(crate) cells: Vec<SearchCell<F>>,
    pub(crate) best_cell: usize,
    pub(crate) best_penalty_index: usize,
    pub(crate) selection: Selection,
    pub(crate) model: ElasticNet<F>,
}

impl<F: Float> ElasticNetSearch<F> {
    /// Create a default parameter set for a grid search
    pub fn params() -> GridSearchParams<F> {
        GridSearchParams::new()
    }

    /// All cells of the grid, in grid order
    pub fn cells(&self) -> &[SearchCell<F>] {
        &self.cells
    }

    /// The winning cell
    pub fn best_cell(&self) -> &SearchCell<F> {
        &self.cells[self.best_cell]
    }

    /// The mixing ratio of the winning cell
    pub fn best_l1_ratio(&self) -> F {
        self.best_cell().l1_ratio
    }

    /// The penalty picked inside the winning cell by the configured
    /// selection rule
    pub fn best_penalty(&self) -> F {
        self.best_cell().cv.penalties()[self.best_penalty_index]
    }

    /// The selection rule the reported model was picked with
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The model refit on the full dataset at the winning pair
    pub fn model(&self) -> &ElasticNet<F> {
        &self.model
    }

    /// Flatten the grid into `(l1_ratio, penalty, mean loss, standard
    /// error)` rows, cell by cell, for diagnostic plotting.
    pub fn loss_table(&self) -> Vec<(F, F, F, F)> {
        self.cells
            .iter()
            .flat_map(|cell| {
                cell.cv
                    .penalties()
                    .iter()
                    .zip(cell.cv.mean_loss().iter())
                    .zip(cell.cv.se_loss().iter())
                    .map(move |((penalty, mean), se)| (cell.l1_ratio, *penalty, *mean, *se))
            })
            .collect()
    }
}

impl<F: Float> Fit<F> for GridSearchValidParams<F> {
    type Object = ElasticNetSearch<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<ElasticNetSearch<F>> {
        let cells: Vec<SearchCell<F>> = self
            .l1_ratios()
            .par_iter()
            .map(|&l1_ratio| {
                let cell_params = CvValidParams {
                    path: PathValidParams {
                        l1_ratio,
                        ..self.cv().path().clone()
                    },
                    ..self.cv().clone()
                };
                cell_params
                    .fit(dataset)
                    .map(|cv| SearchCell { l1_ratio, cv })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best_cell = 0;
        for (i, cell) in cells.iter().enumerate() {
            let candidate = cell.cv.mean_loss()[cell.cv.index_min()];
            let incumbent = cells[best_cell].cv.mean_loss()[cells[best_cell].cv.index_min()];
            if candidate < incumbent {
                best_cell = i;
            }
        }

        let winner = &cells[best_cell];
        let best_penalty_index = match self.selection() {
            Selection::Minimum => winner.cv.index_min(),
            Selection::OneStandardError => winner.cv.index_1se(),
        };
        // the cell already carries a full-data refit over its path
        let model = winner.cv.path().model_at(best_penalty_index);

        Ok(ElasticNetSearch {
            cells,
            best_cell,
            best_penalty_index,
            selection: self.selection(),
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    use crate::metrics::r2;
    use crate::traits::{Fit, Predict};
    use crate::{Dataset, ElasticNetSearch, Selection};

    fn noisy_linear_dataset() -> Dataset<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(17);
        let x = Array::random_using((40, 5), Uniform::new(-1.0, 1.0), &mut rng);
        let noise = Array::random_using(40, Uniform::new(-0.3, 0.3), &mut rng);
        let y = 2.0 * &x.column(0) - &x.column(1) + &noise;
        Dataset::new(x, y)
    }

    #[test]
    fn sweep_is_deterministic() {
        let dataset = noisy_linear_dataset();

        let params = ElasticNetSearch::params()
            .l1_ratios(vec![0.0, 0.5, 1.0])
            .nfolds(4)
            .n_penalties(20);
        let first = params.clone().fit(&dataset).unwrap();
        let second = params.fit(&dataset).unwrap();

        assert_eq!(first.best_l1_ratio(), second.best_l1_ratio());
        assert_eq!(first.best_penalty(), second.best_penalty());
        assert_eq!(first.loss_table(), second.loss_table());
    }

    #[test]
    fn loss_table_covers_every_cell() {
        let dataset = noisy_linear_dataset();

        let search = ElasticNetSearch::params()
            .l1_ratios(vec![0.0, 0.5, 1.0])
            .nfolds(4)
            .n_penalties(20)
            .fit(&dataset)
            .unwrap();

        let table = search.loss_table();
        assert_eq!(table.len(), 3 * 20);
        assert!(table
            .iter()
            .all(|(_, penalty, mean, se)| penalty.is_finite() && mean.is_finite() && se.is_finite()));
        assert_eq!(search.cells().len(), 3);
    }

    #[test]
    fn one_standard_error_selection_is_more_regularized() {
        let dataset = noisy_linear_dataset();

        let params = ElasticNetSearch::params()
            .l1_ratios(vec![0.2, 0.8])
            .nfolds(4)
            .n_penalties(25);
        let at_minimum = params.clone().fit(&dataset).unwrap();
        let within_one_se = params.selection(Selection::OneStandardError).fit(&dataset).unwrap();

        // same winning cell, only the penalty choice differs
        assert_eq!(at_minimum.best_l1_ratio(), within_one_se.best_l1_ratio());
        assert!(within_one_se.best_penalty() >= at_minimum.best_penalty());
    }

    #[test]
    fn selected_model_explains_the_training_data() {
        let dataset = noisy_linear_dataset();

        let search = ElasticNetSearch::params()
            .l1_ratios(vec![0.0, 0.5, 1.0])
            .nfolds(4)
            .n_penalties(20)
            .fit(&dataset)
            .unwrap();

        let records = dataset.records();
        let predictions = search.model().predict(&records);
        assert!(r2(predictions.view(), dataset.targets()) > 0.5);
    }
}
