//! Truncated SVD of the (centred) measurement matrix `S`.

use ndarray::{Array1, Array2, ArrayView2};
use tracing::trace;

use crate::dense;
use crate::error::LinalgError;
use crate::truncation::Truncation;

/// Output of [`svd_truncated`].
///
/// `S ≈ U₀ · diag(σ₀) · V₀ᵀ` restricted to the significant components;
/// `inv_sig0[i]` is `1/σ₀[i]` for the retained components and exactly zero
/// for the rest.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    u0: Array2<f64>,
    v0t: Option<Array2<f64>>,
    sig0: Array1<f64>,
    inv_sig0: Array1<f64>,
    num_significant: usize,
}

impl TruncatedSvd {
    /// Left singular vectors `U₀` (`nrobs × nrmin`).
    pub fn u0(&self) -> &Array2<f64> {
        &self.u0
    }

    /// Transposed right singular vectors `V₀ᵀ` (`nrmin × nens`), if requested.
    pub fn v0t(&self) -> Option<&Array2<f64>> {
        self.v0t.as_ref()
    }

    /// All singular values, descending (`nrmin`).
    pub fn sig0(&self) -> &Array1<f64> {
        &self.sig0
    }

    /// Inverted significant singular values, zero-padded (`nrmin`).
    pub fn inv_sig0(&self) -> &Array1<f64> {
        &self.inv_sig0
    }

    /// Number of retained components.
    pub fn num_significant(&self) -> usize {
        self.num_significant
    }

    /// `min(nrobs, nens)`.
    pub fn nrmin(&self) -> usize {
        self.sig0.len()
    }

    pub(crate) fn into_parts(self) -> (Array2<f64>, Option<Array2<f64>>, Array1<f64>) {
        (self.u0, self.v0t, self.inv_sig0)
    }
}

/// Number of leading singular values needed to reach `fraction` of the
/// total energy `Σσ²`.
///
/// A value is included while the running energy ratio is still below
/// `fraction`, so `fraction = 1.0` keeps every non-zero value. Returns 0 for
/// an all-zero spectrum.
pub fn num_significant(sig0: &[f64], fraction: f64) -> usize {
    let total: f64 = sig0.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return 0;
    }
    let mut running = 0.0;
    let mut n = 0;
    for &s in sig0 {
        if running / total < fraction {
            n += 1;
            running += s * s;
        } else {
            break;
        }
    }
    n
}

/// Relative threshold under which a singular value counts as zero.
fn zero_tolerance(sig_max: f64, rows: usize, cols: usize) -> f64 {
    sig_max * f64::EPSILON * rows.max(cols) as f64
}

/// Computes the truncated SVD of `s` (`nrobs × nens`).
///
/// With [`Truncation::Components`] the number of retained values is
/// `min(n, nrmin)`; with [`Truncation::Energy`] it follows
/// [`num_significant`]. Numerically zero singular values are never inverted,
/// whatever the policy says.
///
/// # Errors
///
/// Propagates [`LinalgError::InvalidTruncation`] from the policy and the
/// decomposition errors of [`dense::svd`].
pub fn svd_truncated(
    s: ArrayView2<'_, f64>,
    truncation: Truncation,
    want_v0t: bool,
) -> Result<TruncatedSvd, LinalgError> {
    truncation.validate()?;
    let (rows, cols) = s.dim();
    let decomposition = dense::svd(s, want_v0t)?;
    let sig0 = decomposition.sigma;
    let nrmin = sig0.len();

    let requested = match truncation {
        Truncation::Components(n) => n.min(nrmin),
        Truncation::Energy(f) => num_significant(sig0.as_slice().unwrap_or(&[]), f),
    };

    let tol = zero_tolerance(sig0.first().copied().unwrap_or(0.0), rows, cols);
    let mut inv_sig0 = Array1::zeros(nrmin);
    let mut retained = 0;
    for i in 0..requested {
        if sig0[i] > tol {
            inv_sig0[i] = 1.0 / sig0[i];
            retained += 1;
        }
    }
    trace!(nrmin, requested, retained, "truncated SVD of S");

    Ok(TruncatedSvd {
        u0: decomposition.u,
        v0t: decomposition.vt,
        sig0,
        inv_sig0,
        num_significant: retained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn num_significant_basic() {
        // energies: 16, 4, 1 -> total 21
        let sig = [4.0, 2.0, 1.0];
        assert_eq!(num_significant(&sig, 0.5), 1);
        // after 1: 16/21 = 0.76 < 0.9 -> include second
        assert_eq!(num_significant(&sig, 0.9), 2);
        // after 2: 20/21 = 0.952 < 0.99 -> include third
        assert_eq!(num_significant(&sig, 0.99), 3);
        assert_eq!(num_significant(&sig, 1.0), 3);
    }

    #[test]
    fn num_significant_zero_spectrum() {
        assert_eq!(num_significant(&[0.0, 0.0], 0.9), 0);
        assert_eq!(num_significant(&[], 0.9), 0);
    }

    #[test]
    fn rank_deficient_gives_zero_inverse() {
        // Third column = first + second: rank 2, one zero singular value.
        let s = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 2.0]];
        let svd = svd_truncated(s.view(), Truncation::Energy(0.95), false).unwrap();
        assert_eq!(svd.nrmin(), 3);
        assert!(svd.inv_sig0().iter().all(|v| v.is_finite()));
        assert_eq!(svd.inv_sig0()[2], 0.0);
        assert!(svd.num_significant() <= 2);
    }

    #[test]
    fn rank_deficient_components_still_guarded() {
        let s = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 2.0]];
        let svd = svd_truncated(s.view(), Truncation::Components(3), false).unwrap();
        assert_eq!(svd.inv_sig0()[2], 0.0);
        assert_eq!(svd.num_significant(), 2);
    }

    #[test]
    fn components_clamped_to_nrmin() {
        let s = array![[2.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];
        let svd = svd_truncated(s.view(), Truncation::Components(10), true).unwrap();
        assert_eq!(svd.nrmin(), 2);
        assert_eq!(svd.num_significant(), 2);
        assert_abs_diff_eq!(svd.inv_sig0()[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(svd.inv_sig0()[1], 1.0, epsilon = 1e-12);
        assert_eq!(svd.v0t().unwrap().dim(), (2, 4));
    }

    #[test]
    fn energy_truncation_zeroes_tail() {
        let s = array![[10.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.1]];
        let svd = svd_truncated(s.view(), Truncation::Energy(0.9), false).unwrap();
        assert_eq!(svd.num_significant(), 1);
        assert_abs_diff_eq!(svd.inv_sig0()[0], 0.1, epsilon = 1e-12);
        assert_eq!(svd.inv_sig0()[1], 0.0);
        assert_eq!(svd.inv_sig0()[2], 0.0);
    }

    #[test]
    fn zero_matrix_has_no_components() {
        let s = Array2::<f64>::zeros((3, 4));
        let svd = svd_truncated(s.view(), Truncation::Energy(0.99), false).unwrap();
        assert_eq!(svd.num_significant(), 0);
        assert!(svd.inv_sig0().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn invalid_truncation_rejected() {
        let s = array![[1.0, 0.0], [0.0, 1.0]];
        assert!(matches!(
            svd_truncated(s.view(), Truncation::Components(0), false),
            Err(LinalgError::InvalidTruncation { .. })
        ));
    }
}
