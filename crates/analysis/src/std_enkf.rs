//! Standard EnKF update with a truncated-SVD inverse.

use ert_linalg::{Truncation, init_std_x, lowrank_cinv, subtract_row_mean};
use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::error::AnalysisError;
use crate::input::AnalysisInput;
use crate::options::ModuleOptions;
use crate::params::{ENKF_NCOMP, ENKF_TRUNCATION};

/// Standard ensemble Kalman filter.
///
/// Computes `X = I + Sᵀ · (S·Sᵀ + (N−1)·R)⁻¹ · D` with the inverse
/// approximated through a truncated SVD of the centred `S`, so that the
/// updated ensemble is `A · X`.
///
/// # Example
///
/// ```
/// use ert_analysis::{AnalysisInput, StdEnkf};
/// use ndarray::{Array2, array};
///
/// let s = array![[1.0, 2.0, 4.0], [0.5, 0.0, -0.5]];
/// let r = Array2::<f64>::eye(2);
/// let d_obs = Array2::<f64>::zeros((2, 2));
/// let d = Array2::<f64>::zeros((2, 3));
/// let input = AnalysisInput::new(s.view(), r.view(), d_obs.view(), d.view(), d.view());
/// let a = Array2::<f64>::ones((4, 3));
///
/// let x = StdEnkf::new().init_x(a.view(), &input).unwrap();
/// assert_eq!(x, Array2::<f64>::eye(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StdEnkf {
    truncation: Truncation,
}

impl StdEnkf {
    /// Name used in configuration files and logs.
    pub const NAME: &'static str = "STD_ENKF";

    /// Creates a module with the default truncation `Energy(0.98)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the truncation policy.
    pub fn with_truncation(mut self, truncation: Truncation) -> Self {
        self.truncation = truncation;
        self
    }

    /// Returns the truncation policy.
    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    /// Keeps singular values up to this energy fraction. Replaces any
    /// fixed subspace dimension.
    pub fn set_truncation(&mut self, fraction: f64) {
        self.truncation = Truncation::Energy(fraction);
    }

    /// Keeps exactly `n` singular values. Replaces the energy fraction.
    pub fn set_subspace_dimension(&mut self, n: usize) {
        self.truncation = Truncation::Components(n);
    }

    /// Flags advertised to the orchestrator.
    pub fn options(&self) -> ModuleOptions {
        ModuleOptions::NEED_ED
    }

    /// Computes the full update matrix `X` (`nens × nens`) with `A_new = A·X`.
    ///
    /// `A` is only used to check the ensemble size.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DimensionMismatch`] for inconsistent shapes and
    /// propagates SVD failures.
    pub fn init_x(
        &self,
        a: ArrayView2<'_, f64>,
        input: &AnalysisInput<'_>,
    ) -> Result<Array2<f64>, AnalysisError> {
        input.validate_ensemble(a)?;
        self.compute_x(input, true)
    }

    /// Computes the correction `X − I`, for callers that add the prior
    /// ensemble themselves.
    pub(crate) fn correction_x(
        &self,
        input: &AnalysisInput<'_>,
    ) -> Result<Array2<f64>, AnalysisError> {
        self.compute_x(input, false)
    }

    fn compute_x(
        &self,
        input: &AnalysisInput<'_>,
        with_identity: bool,
    ) -> Result<Array2<f64>, AnalysisError> {
        input.validate()?;
        let mut s = input.s.to_owned();
        subtract_row_mean(&mut s);

        let cinv = lowrank_cinv(s.view(), input.r, self.truncation)?;
        let x = init_std_x(
            s.view(),
            input.d,
            cinv.w().view(),
            cinv.eig().view(),
            with_identity,
        )?;
        debug!(
            nrobs = input.nrobs(),
            nens = input.ens_size(),
            num_significant = cinv.num_significant(),
            "std_enkf update matrix"
        );
        Ok(x)
    }

    pub(crate) fn set_double(&mut self, name: &str, value: f64) -> bool {
        match name {
            ENKF_TRUNCATION => {
                self.set_truncation(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_int(&mut self, name: &str, value: i64) -> bool {
        match name {
            ENKF_NCOMP => {
                self.truncation = self.truncation.with_ncomp(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get_double(&self, name: &str) -> Option<f64> {
        match name {
            ENKF_TRUNCATION => self.truncation.energy(),
            _ => None,
        }
    }

    pub(crate) fn get_int(&self, name: &str) -> Option<i64> {
        match name {
            ENKF_NCOMP => self
                .truncation
                .components()
                .and_then(|n| i64::try_from(n).ok()),
            _ => None,
        }
    }

    pub(crate) fn has_var(name: &str) -> bool {
        matches!(name, ENKF_TRUNCATION | ENKF_NCOMP)
    }
}
