use crate::dataset::{Dataset, Float};
use crate::error::Result;
use crate::traits::Fit;

/// A set of hyper-parameters whose values have not been checked for validity.
/// A reference to the checked parameters can only be obtained after checking
/// has completed. If the `Fit` trait has been implemented on the checked set,
/// it is also implemented on the unchecked set with the checking step done
/// automatically.
///
/// The validation done in `check_ref()` and `check()` is identical.
pub trait ParamGuard {
    /// The checked parameter set
    type Checked;

    /// Check the parameter set and borrow it when valid
    fn check_ref(&self) -> Result<&Self::Checked>;

    /// Check the parameter set and move it out when valid
    fn check(self) -> Result<Self::Checked>;
}

impl<F: Float, P: ParamGuard> Fit<F> for P
where
    P::Checked: Fit<F>,
{
    type Object = <P::Checked as Fit<F>>::Object;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        self.check_ref()?.fit(dataset)
    }
}
