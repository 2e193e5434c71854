//! Cyclical coordinate descent on the penalized least squares problem

use approx::{abs_diff_eq, abs_diff_ne};
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};

use crate::dataset::{Dataset, Float};
use crate::error::{PathwiseError, Result};
use crate::hyperparams::ElasticNetValidParams;
use crate::traits::{Fit, Predict};
use crate::ElasticNet;

impl<F: Float> Fit<F> for ElasticNetValidParams<F> {
    type Object = ElasticNet<F>;

    /// Fit an elastic net model given a design matrix `X` of shape
    /// `(n_samples, n_features)` and a target vector `y` of shape
    /// `(n_samples)`.
    ///
    /// Returns a fitted `ElasticNet` object which contains the fitted
    /// parameters and can be used to `predict` values of the target variable
    /// for new feature values.
    fn fit(&self, dataset: &Dataset<F>) -> Result<ElasticNet<F>> {
        let prep = preprocess(
            dataset.records(),
            dataset.targets(),
            self.with_intercept(),
            self.standardize(),
        )?;
        let mut beta = Array1::zeros(dataset.nfeatures());
        let state = coordinate_descent(
            prep.x.view(),
            prep.y.view(),
            &mut beta,
            self.tolerance(),
            self.max_iterations(),
            self.l1_ratio(),
            self.penalty(),
        );
        Ok(prep.restore(beta, &state))
    }
}

impl<F: Float, D: Data<Elem = F>> Predict<&ArrayBase<D, Ix2>, Array1<F>> for ElasticNet<F> {
    /// Given an input matrix `X`, with shape `(n_samples, n_features)`,
    /// `predict` returns the target variable according to the elastic net
    /// learned from the training data distribution.
    fn predict(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        x.dot(&self.hyperplane) + self.intercept
    }
}

/// The design and targets shifted and scaled for descent, together with
/// whatever is needed to map coefficients back to the original scale.
pub(crate) struct Preprocessed<F: Float> {
    pub(crate) x: Array2<F>,
    pub(crate) y: Array1<F>,
    x_mean: Array1<F>,
    x_scale: Array1<F>,
    y_mean: F,
}

impl<F: Float> Preprocessed<F> {
    /// Map a solution of the standardized problem back to the original
    /// feature scale and wrap it into a model.
    pub(crate) fn restore(&self, beta: Array1<F>, state: &CdState<F>) -> ElasticNet<F> {
        let hyperplane = &beta / &self.x_scale;
        let intercept = self.y_mean - hyperplane.dot(&self.x_mean);
        ElasticNet {
            hyperplane,
            intercept,
            duality_gap: state.gap,
            n_steps: state.n_steps,
            converged: state.converged,
        }
    }
}

/// Center and scale the problem ahead of descent.
///
/// The means are subtracted only when an intercept is requested; the scale
/// divisors stay at one unless `standardize` is set. Zero-variance columns
/// abort the fit before any descent iteration runs, as they cannot be
/// penalized comparably to the rest.
pub(crate) fn preprocess<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    with_intercept: bool,
    standardize: bool,
) -> Result<Preprocessed<F>> {
    if x.nrows() != y.len() {
        return Err(PathwiseError::ShapeMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }
    if x.nrows() < 2 {
        return Err(PathwiseError::NotEnoughSamples(x.nrows()));
    }

    let n = F::cast(x.nrows());
    let means = x.mean_axis(Axis(0)).unwrap();
    let mut scale = Array1::ones(x.ncols());
    for (j, col) in x.axis_iter(Axis(1)).enumerate() {
        let mean = means[j];
        let variance = col.iter().map(|v| (*v - mean) * (*v - mean)).sum::<F>() / n;
        // zero test relative to the column's magnitude
        if variance <= F::epsilon() * (F::one() + mean * mean) {
            return Err(PathwiseError::DegenerateColumn(j));
        }
        if standardize {
            scale[j] = variance.sqrt();
        }
    }

    let x_mean = if with_intercept {
        means
    } else {
        Array1::zeros(x.ncols())
    };
    let y_mean = if with_intercept {
        y.iter().copied().sum::<F>() / n
    } else {
        F::zero()
    };

    let mut x = x.to_owned();
    for (j, mut col) in x.axis_iter_mut(Axis(1)).enumerate() {
        let mean = x_mean[j];
        let divisor = scale[j];
        col.mapv_inplace(|v| (v - mean) / divisor);
    }
    let y = y.mapv(|v| v - y_mean);

    Ok(Preprocessed {
        x,
        y,
        x_mean,
        x_scale: scale,
        y_mean,
    })
}

/// Final state of a coordinate descent run.
pub(crate) struct CdState<F> {
    pub(crate) n_steps: u32,
    pub(crate) gap: F,
    pub(crate) last_change: F,
    pub(crate) converged: bool,
}

/// Cyclical coordinate descent on the (standardized) elastic net problem.
///
/// `beta` carries the warm start in and the solution out; residuals are
/// maintained incrementally as coefficients move. A pass whose largest
/// relative coefficient change falls below `tol` triggers the duality gap
/// certificate, the ultimate stopping criterion for any mix with an L1
/// component. A pure L2 mix has no dual scaling to certify with, so it
/// stops on coefficient stability alone.
pub(crate) fn coordinate_descent<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    beta: &mut Array1<F>,
    tol: F,
    max_steps: u32,
    l1_ratio: F,
    penalty: F,
) -> CdState<F> {
    let n_samples = F::cast(x.nrows());
    let n_features = x.ncols();
    let norm_cols_x = x.map_axis(Axis(0), |col| col.dot(&col));
    let l1_term = n_samples * l1_ratio * penalty;
    let l2_term = n_samples * (F::one() - l1_ratio) * penalty;

    // residuals under the warm start
    let mut r = y.to_owned();
    r -= &x.dot(&beta.view());

    let mut n_steps = 0u32;
    let mut gap = F::one() + tol;
    let mut last_change = F::one() + tol;
    let mut converged = false;
    let d_w_tol = tol;
    let gap_tol = tol * y.dot(&y);

    while n_steps < max_steps {
        let mut w_max = F::zero();
        let mut d_w_max = F::zero();
        for j in 0..n_features {
            if abs_diff_eq!(norm_cols_x[j], F::zero()) {
                continue;
            }
            let old = beta[j];
            let x_j: ArrayView1<F> = x.slice(s![.., j]);
            if abs_diff_ne!(old, F::zero()) {
                r += &(&x_j * old);
            }
            let partial = x_j.dot(&r);
            beta[j] = partial.signum() * F::max(partial.abs() - l1_term, F::zero())
                / (norm_cols_x[j] + l2_term);
            if abs_diff_ne!(beta[j], F::zero()) {
                r -= &(&x_j * beta[j]);
            }
            d_w_max = F::max(d_w_max, (beta[j] - old).abs());
            w_max = F::max(w_max, beta[j].abs());
        }
        n_steps += 1;

        let stable = abs_diff_eq!(w_max, F::zero()) || d_w_max / w_max < d_w_tol;
        last_change = if w_max > F::zero() {
            d_w_max / w_max
        } else {
            F::zero()
        };
        if stable || n_steps == max_steps {
            gap = duality_gap(x, y, beta.view(), r.view(), l1_ratio, penalty);
            converged = if l1_term > F::zero() {
                gap <= gap_tol
            } else {
                stable
            };
            if converged || n_steps == max_steps {
                break;
            }
        }
    }

    CdState {
        n_steps,
        gap,
        last_change,
        converged,
    }
}

fn duality_gap<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    w: ArrayView1<F>,
    r: ArrayView1<F>,
    l1_ratio: F,
    penalty: F,
) -> F {
    let half = F::cast(0.5);
    let n_samples = F::cast(x.nrows());
    let l1_reg = l1_ratio * penalty * n_samples;
    let l2_reg = (F::one() - l1_ratio) * penalty * n_samples;
    let xta = x.t().dot(&r) - &w * l2_reg;

    let dual_norm_xta = xta.fold(F::zero(), |abs_max, &v| abs_max.max(v.abs()));
    let r_norm2 = r.dot(&r);
    let w_norm2 = w.dot(&w);
    let (scaling, mut gap) = if dual_norm_xta > l1_reg {
        let scaling = l1_reg / dual_norm_xta;
        (scaling, half * r_norm2 * (F::one() + scaling * scaling))
    } else {
        (F::one(), r_norm2)
    };
    let l1_norm = w.fold(F::zero(), |sum, v| sum + v.abs());
    gap += l1_reg * l1_norm - scaling * r.dot(&y)
        + half * l2_reg * (F::one() + scaling * scaling) * w_norm2;
    gap
}

#[cfg(test)]
mod tests {
    use super::{coordinate_descent, preprocess};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    use crate::error::PathwiseError;
    use crate::traits::{Fit, Predict};
    use crate::{Dataset, ElasticNet};

    fn elastic_net_objective(
        x: &Array2<f64>,
        y: &Array1<f64>,
        intercept: f64,
        beta: &Array1<f64>,
        l1_ratio: f64,
        penalty: f64,
    ) -> f64 {
        squared_error(x, y, intercept, beta) + penalty * elastic_net_penalty(beta, l1_ratio)
    }

    fn squared_error(x: &Array2<f64>, y: &Array1<f64>, intercept: f64, beta: &Array1<f64>) -> f64 {
        let mut resid = -x.dot(beta);
        resid -= intercept;
        resid += y;
        let mut result = 0.0;
        for r in &resid {
            result += r * r;
        }
        result /= 2.0 * y.len() as f64;
        result
    }

    fn elastic_net_penalty(beta: &Array1<f64>, l1_ratio: f64) -> f64 {
        let mut penalty = 0.0;
        for beta_j in beta {
            penalty += (1.0 - l1_ratio) / 2.0 * beta_j * beta_j + l1_ratio * beta_j.abs();
        }
        penalty
    }

    #[test]
    fn elastic_net_penalty_works() {
        let beta = array![-2.0, 1.0];
        assert_abs_diff_eq!(
            elastic_net_penalty(&beta, 0.8),
            0.4 + 0.1 + 1.6 + 0.8,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(elastic_net_penalty(&beta, 1.0), 3.0);
        assert_abs_diff_eq!(elastic_net_penalty(&beta, 0.0), 2.5);

        let beta2 = array![0.0, 0.0];
        assert_abs_diff_eq!(elastic_net_penalty(&beta2, 0.8), 0.0);
    }

    #[test]
    fn squared_error_works() {
        let x = array![[2.0, 1.0], [-1.0, 2.0]];
        let y = array![1.0, 1.0];
        let beta = array![0.0, 1.0];
        assert_abs_diff_eq!(squared_error(&x, &y, 0.0, &beta), 0.25);
    }

    #[test]
    fn coordinate_descent_lowers_objective() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![1.0, -1.0];
        let mut beta = array![0.0, 0.0];
        let objective_start = elastic_net_objective(&x, &y, 0.0, &beta, 0.8, 0.001);
        coordinate_descent(x.view(), y.view(), &mut beta, 1e-4, 3, 0.8, 0.001);
        let objective_end = elastic_net_objective(&x, &y, 0.0, &beta, 0.8, 0.001);
        assert!(objective_start > objective_end);
    }

    #[test]
    fn lasso_toy_example_works() {
        // Test lasso on a toy example for various values of the penalty.
        // When validating this against glmnet notice that glmnet divides it
        // against n_samples.
        let dataset = Dataset::new(array![[-1.0], [0.0], [1.0]], array![-1.0, 0.0, 1.0]);

        // input for prediction
        let t = array![[2.0], [3.0], [4.0]];
        let model = ElasticNet::lasso()
            .standardize(false)
            .penalty(1e-8)
            .fit(&dataset)
            .unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.parameters(), &array![1.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![2.0, 3.0, 4.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.duality_gap(), 0.0, epsilon = 1e-12);

        let model = ElasticNet::lasso()
            .standardize(false)
            .penalty(0.1)
            .fit(&dataset)
            .unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.parameters(), &array![0.85], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![1.7, 2.55, 3.4], epsilon = 1e-6);
        assert_abs_diff_eq!(model.duality_gap(), 0.0, epsilon = 1e-12);

        let model = ElasticNet::lasso()
            .standardize(false)
            .penalty(0.5)
            .fit(&dataset)
            .unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.parameters(), &array![0.25], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![0.5, 0.75, 1.0], epsilon = 1e-6);

        let model = ElasticNet::lasso()
            .standardize(false)
            .penalty(1.0)
            .fit(&dataset)
            .unwrap();
        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.parameters(), &array![0.0], epsilon = 1e-6);
        assert_abs_diff_eq!(model.predict(&t), array![0.0, 0.0, 0.0], epsilon = 1e-6);
        assert_eq!(model.nonzero_count(), 0);
    }

    #[test]
    fn elastic_net_toy_example_works() {
        let dataset = Dataset::new(array![[-1.0], [0.0], [1.0]], array![-1.0, 0.0, 1.0]);

        let t = array![[2.0], [3.0], [4.0]];
        let model = ElasticNet::params()
            .standardize(false)
            .l1_ratio(0.3)
            .penalty(0.5)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.parameters(), &array![0.50819], epsilon = 1e-3);
        assert_abs_diff_eq!(
            model.predict(&t),
            array![1.0163, 1.5245, 2.0327],
            epsilon = 1e-3
        );

        let model = ElasticNet::params()
            .standardize(false)
            .l1_ratio(0.5)
            .penalty(0.5)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.intercept(), 0.0);
        assert_abs_diff_eq!(model.parameters(), &array![0.45454], epsilon = 1e-3);
        assert_abs_diff_eq!(
            model.predict(&t),
            array![0.9090, 1.3636, 1.8181],
            epsilon = 1e-3
        );
    }

    #[test]
    fn unpenalized_fit_recovers_least_squares_line() {
        // y = 1 + 2x, exactly
        let dataset = Dataset::new(
            array![[0.0], [1.0], [2.0], [3.0]],
            array![1.0, 3.0, 5.0, 7.0],
        );

        let model = ElasticNet::params().penalty(0.0).fit(&dataset).unwrap();
        assert_abs_diff_eq!(model.intercept(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(model.parameters(), &array![2.0], epsilon = 1e-6);
    }

    #[test]
    fn ridge_at_vanishing_penalty_matches_ordinary_least_squares() {
        // closed form solution of X^T X beta = X^T y for this system
        // is beta = [1, 2]
        let dataset = Dataset::new(
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            array![1.0, 2.0, 3.0],
        );

        let model = ElasticNet::ridge()
            .with_intercept(false)
            .standardize(false)
            .penalty(1e-10)
            .fit(&dataset)
            .unwrap();

        assert_abs_diff_eq!(model.parameters(), &array![1.0, 2.0], epsilon = 1e-4);
        assert!(model.is_converged());
    }

    #[test]
    fn zero_variance_column_fails_before_fitting() {
        let dataset = Dataset::new(
            array![[1.0, 2.0], [1.0, 3.0], [1.0, 4.0]],
            array![1.0, 2.0, 3.0],
        );

        let err = ElasticNet::params().fit(&dataset).unwrap_err();
        assert_eq!(err, PathwiseError::DegenerateColumn(0));
    }

    #[test]
    fn single_sample_fails() {
        let dataset = Dataset::new(array![[1.0, 2.0]], array![1.0]);
        let err = ElasticNet::params().fit(&dataset).unwrap_err();
        assert_eq!(err, PathwiseError::NotEnoughSamples(1));
    }

    #[test]
    fn mismatched_shapes_fail() {
        let dataset = Dataset::new(array![[1.0], [2.0], [3.0]], array![1.0, 2.0]);
        let err = ElasticNet::params().fit(&dataset).unwrap_err();
        assert_eq!(
            err,
            PathwiseError::ShapeMismatch {
                rows: 3,
                targets: 2
            }
        );
    }

    #[test]
    fn standardized_fits_are_scale_invariant() {
        let records = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [3.0, 4.0],
            [4.0, 3.0],
            [5.0, 6.0],
            [6.0, 5.0]
        ];
        let targets = array![2.1, 4.2, 5.8, 8.1, 9.9, 12.2];
        let dataset = Dataset::new(records.clone(), targets.clone());

        let mut scaled = records;
        scaled.column_mut(1).mapv_inplace(|v| v * 10.0);
        let scaled_dataset = Dataset::new(scaled, targets);

        let params = ElasticNet::params().penalty(0.1).l1_ratio(0.5);
        let model = params.clone().fit(&dataset).unwrap();
        let scaled_model = params.fit(&scaled_dataset).unwrap();

        // the scaled column's coefficient shrinks by the scaling factor,
        // everything else is untouched
        assert_abs_diff_eq!(
            model.parameters()[1],
            scaled_model.parameters()[1] * 10.0,
            epsilon = 1e-8
        );
        assert_abs_diff_eq!(
            model.parameters()[0],
            scaled_model.parameters()[0],
            epsilon = 1e-8
        );

        let t = array![[7.0, 8.0]];
        let t_scaled = array![[7.0, 80.0]];
        assert_abs_diff_eq!(
            model.predict(&t),
            scaled_model.predict(&t_scaled),
            epsilon = 1e-8
        );
    }

    #[test]
    fn preprocess_centers_and_scales() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let y = array![1.0, 2.0, 3.0];

        let prep = preprocess(x.view(), y.view(), true, true).unwrap();
        for col in prep.x.columns() {
            assert_abs_diff_eq!(col.sum(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(col.dot(&col) / 3.0, 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(prep.y.sum(), 0.0, epsilon = 1e-12);
    }
}
