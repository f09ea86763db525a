//! Low-rank approximation of `C⁻¹ = (S·Sᵀ + (N−1)·R)⁻¹`.
//!
//! With `S = U₀ Σ₀ V₀ᵀ` truncated, the inverse is approximated as
//!
//! ```text
//! B      = (N−1) · Σ₀⁺ · U₀ᵀ · R · U₀ · Σ₀⁺
//! B      = Z · Λ · Zᵀ                       (SVD of the symmetric B)
//! eig    = (I + Λ)⁻¹
//! W      = U₀ · Σ₀⁺ · Z
//! C⁻¹   ≈ W · diag(eig) · Wᵀ
//! ```

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use tracing::debug;

use crate::dense;
use crate::error::LinalgError;
use crate::svd::svd_truncated;
use crate::truncation::Truncation;

/// Result of [`lowrank_cinv`]: `C⁻¹ ≈ W · diag(eig) · Wᵀ`.
#[derive(Debug, Clone)]
pub struct LowRankCinv {
    w: Array2<f64>,
    eig: Array1<f64>,
    num_significant: usize,
}

impl LowRankCinv {
    /// Scaled left singular vectors `W` (`nrobs × nrmin`).
    pub fn w(&self) -> &Array2<f64> {
        &self.w
    }

    /// Adjusted eigenvalues `1/(1+λᵢ)` (`nrmin`).
    pub fn eig(&self) -> &Array1<f64> {
        &self.eig
    }

    /// Number of singular values of `S` retained by the truncation.
    pub fn num_significant(&self) -> usize {
        self.num_significant
    }
}

/// Projects the observation-error covariance onto the truncated SVD basis:
/// `B = (nens−1) · Σ₀⁺ · U₀ᵀ · R · U₀ · Σ₀⁺` (`nrmin × nrmin`).
pub fn cee(
    r: ArrayView2<'_, f64>,
    u0: ArrayView2<'_, f64>,
    inv_sig0: ArrayView1<'_, f64>,
    nens: usize,
) -> Array2<f64> {
    let x0 = u0.t().dot(&r);
    let mut b = x0.dot(&u0);
    let scale = nens.saturating_sub(1) as f64;
    for ((i, j), v) in b.indexed_iter_mut() {
        *v *= inv_sig0[i] * inv_sig0[j] * scale;
    }
    b
}

/// Builds the low-rank inverse of `S·Sᵀ + (N−1)·R`.
///
/// `s` is expected to be centred already (row means removed).
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`LinalgError::DimensionMismatch`] | `r` is not `nrobs × nrobs` |
/// | [`LinalgError::InvalidTruncation`] | the truncation policy is out of range |
/// | [`LinalgError::SvdNotConverged`] | either SVD fails |
pub fn lowrank_cinv(
    s: ArrayView2<'_, f64>,
    r: ArrayView2<'_, f64>,
    truncation: Truncation,
) -> Result<LowRankCinv, LinalgError> {
    let (nrobs, nens) = s.dim();
    if r.dim() != (nrobs, nrobs) {
        return Err(LinalgError::DimensionMismatch {
            what: "R",
            expected_rows: nrobs,
            expected_cols: nrobs,
            rows: r.nrows(),
            cols: r.ncols(),
        });
    }

    let svd = svd_truncated(s, truncation, false)?;
    let num_significant = svd.num_significant();
    let (u0, _, inv_sig0) = svd.into_parts();

    let b = cee(r, u0.view(), inv_sig0.view(), nens);
    let b_svd = dense::svd(b.view(), false)?;

    let eig = b_svd.sigma.mapv(|lambda| 1.0 / (1.0 + lambda));
    let mut z = b_svd.u;
    for ((i, _), v) in z.indexed_iter_mut() {
        *v *= inv_sig0[i];
    }
    let w = u0.dot(&z);
    debug!(nrobs, nens, num_significant, "low-rank C inverse");

    Ok(LowRankCinv {
        w,
        eig,
        num_significant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::subtract_row_mean;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, StandardNormal};

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| StandardNormal.sample(&mut rng))
    }

    #[test]
    fn cee_identity_case() {
        // U0 = I, inv_sig0 = 1, R = I -> B = (N-1) I
        let u0 = Array2::<f64>::eye(2);
        let r = Array2::<f64>::eye(2);
        let inv = array![1.0, 1.0];
        let b = cee(r.view(), u0.view(), inv.view(), 5);
        assert_abs_diff_eq!(b[[0, 0]], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b[[1, 1]], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cee_scales_by_inverse_singular_values() {
        let u0 = Array2::<f64>::eye(2);
        let r = array![[2.0, 1.0], [1.0, 2.0]];
        let inv = array![0.5, 0.0];
        let b = cee(r.view(), u0.view(), inv.view(), 3);
        // B[0,0] = 2 * 0.5 * 0.5 * 2
        assert_abs_diff_eq!(b[[0, 0]], 1.0, epsilon = 1e-12);
        assert_eq!(b[[0, 1]], 0.0);
        assert_eq!(b[[1, 1]], 0.0);
    }

    #[test]
    fn full_rank_matches_exact_inverse() {
        // nens > nrobs and no truncation: W diag(eig) W' == (S S' + (N-1) R)^-1
        let nrobs = 4;
        let nens = 12;
        let mut s = random_matrix(nrobs, nens, 7);
        subtract_row_mean(&mut s);
        let r = Array2::<f64>::eye(nrobs) * 0.5;

        let lr = lowrank_cinv(s.view(), r.view(), Truncation::Energy(1.0)).unwrap();
        assert_eq!(lr.num_significant(), nrobs);

        let mut weighted = lr.w().t().to_owned();
        for (i, mut row) in weighted.rows_mut().into_iter().enumerate() {
            row.mapv_inplace(|v| v * lr.eig()[i]);
        }
        let approx_inv = lr.w().dot(&weighted);

        let c = s.dot(&s.t()) + &(r.clone() * (nens as f64 - 1.0));
        let exact = dense::invert(c.view(), "C").unwrap();
        for (a, b) in approx_inv.iter().zip(exact.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn eig_in_unit_interval() {
        let mut s = random_matrix(6, 5, 11);
        subtract_row_mean(&mut s);
        let r = Array2::<f64>::eye(6);
        let lr = lowrank_cinv(s.view(), r.view(), Truncation::Energy(0.95)).unwrap();
        assert_eq!(lr.w().dim(), (6, 5));
        assert_eq!(lr.eig().len(), 5);
        assert!(lr.eig().iter().all(|&e| e > 0.0 && e <= 1.0));
    }

    #[test]
    fn wrong_r_shape_rejected() {
        let s = random_matrix(3, 5, 1);
        let r = Array2::<f64>::eye(2);
        assert!(matches!(
            lowrank_cinv(s.view(), r.view(), Truncation::default()),
            Err(LinalgError::DimensionMismatch { what: "R", .. })
        ));
    }
}
