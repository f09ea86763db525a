//! Dense decompositions on `ndarray` matrices.
//!
//! The analysis crates store everything as `Array2<f64>`; the SVD and the
//! inverse are delegated to nalgebra and converted back at this boundary.

use nalgebra::DMatrix;
use nalgebra::linalg::SVD;
use ndarray::{Array1, Array2, ArrayView2};

use crate::error::LinalgError;

/// Singular value decomposition `M = U · diag(σ) · Vᵀ` in the thin form.
///
/// Singular values are sorted in descending order; `u` is `rows × k` and
/// `vt` (when requested) is `k × cols`, with `k = min(rows, cols)`.
#[derive(Debug, Clone)]
pub struct Svd {
    /// Left singular vectors (`rows × k`).
    pub u: Array2<f64>,
    /// Singular values, descending (`k`).
    pub sigma: Array1<f64>,
    /// Right singular vectors, transposed (`k × cols`).
    pub vt: Option<Array2<f64>>,
}

pub(crate) fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

pub(crate) fn check_finite(a: ArrayView2<'_, f64>, what: &'static str) -> Result<(), LinalgError> {
    if a.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(LinalgError::NonFiniteInput { what })
    }
}

/// Computes the thin SVD of `a`.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`LinalgError::EmptyMatrix`] | `a` has no rows or no columns |
/// | [`LinalgError::NonFiniteInput`] | `a` contains NaN or infinity |
/// | [`LinalgError::SvdNotConverged`] | the implicit-shift QR iteration hits its limit |
pub fn svd(a: ArrayView2<'_, f64>, want_vt: bool) -> Result<Svd, LinalgError> {
    let (rows, cols) = a.dim();
    if rows == 0 || cols == 0 {
        return Err(LinalgError::EmptyMatrix {
            what: "SVD input",
            rows,
            cols,
        });
    }
    check_finite(a, "SVD input")?;

    let max_niter = 200 * (rows + cols);
    let decomposition = SVD::try_new(to_dmatrix(a), true, want_vt, f64::EPSILON, max_niter)
        .ok_or(LinalgError::SvdNotConverged { rows, cols })?;

    let u = decomposition
        .u
        .as_ref()
        .ok_or(LinalgError::SvdNotConverged { rows, cols })?;
    let k = decomposition.singular_values.len();

    // Reorder to descending singular values.
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&i, &j| {
        decomposition.singular_values[j]
            .partial_cmp(&decomposition.singular_values[i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let sigma = Array1::from_iter(order.iter().map(|&i| decomposition.singular_values[i]));
    let u = Array2::from_shape_fn((rows, k), |(r, c)| u[(r, order[c])]);
    let vt = match (want_vt, decomposition.v_t.as_ref()) {
        (true, Some(v_t)) => Some(Array2::from_shape_fn((k, cols), |(r, c)| {
            v_t[(order[r], c)]
        })),
        (true, None) => return Err(LinalgError::SvdNotConverged { rows, cols }),
        (false, _) => None,
    };

    Ok(Svd { u, sigma, vt })
}

/// Inverts the square matrix `a`.
///
/// `what` names the matrix in the error message.
///
/// # Errors
///
/// Returns [`LinalgError::DimensionMismatch`] if `a` is not square and
/// [`LinalgError::SingularMatrix`] if the LU factorisation finds it singular
/// or the inverse is not finite.
pub fn invert(a: ArrayView2<'_, f64>, what: &'static str) -> Result<Array2<f64>, LinalgError> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(LinalgError::DimensionMismatch {
            what,
            expected_rows: rows,
            expected_cols: rows,
            rows,
            cols,
        });
    }
    if rows == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    check_finite(a, what)?;

    let inverse = to_dmatrix(a)
        .try_inverse()
        .ok_or(LinalgError::SingularMatrix { what, dim: rows })?;
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::SingularMatrix { what, dim: rows });
    }
    Ok(from_dmatrix(&inverse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn svd_reconstructs_input() {
        let a = array![[3.0, 1.0, 2.0], [1.0, 4.0, 0.5], [2.0, 0.5, 5.0], [1.0, 1.0, 1.0]];
        let d = svd(a.view(), true).unwrap();
        assert_eq!(d.u.dim(), (4, 3));
        assert_eq!(d.sigma.len(), 3);
        let vt = d.vt.unwrap();
        assert_eq!(vt.dim(), (3, 3));

        let mut us = d.u.clone();
        for (c, &s) in d.sigma.iter().enumerate() {
            us.column_mut(c).mapv_inplace(|v| v * s);
        }
        let back = us.dot(&vt);
        for (x, y) in back.iter().zip(a.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn svd_sorted_descending() {
        let a = array![[1.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 3.0]];
        let d = svd(a.view(), false).unwrap();
        assert!(d.vt.is_none());
        assert_abs_diff_eq!(d.sigma[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.sigma[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.sigma[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn svd_wide_matrix() {
        let a = array![[1.0, 2.0, 3.0, 4.0], [2.0, 0.0, 1.0, 1.0]];
        let d = svd(a.view(), true).unwrap();
        assert_eq!(d.u.dim(), (2, 2));
        assert_eq!(d.vt.unwrap().dim(), (2, 4));
    }

    #[test]
    fn svd_rejects_empty() {
        let a = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            svd(a.view(), false),
            Err(LinalgError::EmptyMatrix { rows: 0, cols: 3, .. })
        ));
    }

    #[test]
    fn svd_rejects_nan() {
        let a = array![[1.0, f64::NAN], [0.0, 1.0]];
        assert!(matches!(
            svd(a.view(), false),
            Err(LinalgError::NonFiniteInput { .. })
        ));
    }

    #[test]
    fn invert_roundtrip() {
        let a = array![[4.0, 1.0], [2.0, 3.0]];
        let inv = invert(a.view(), "A").unwrap();
        let eye = a.dot(&inv);
        assert_abs_diff_eq!(eye[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eye[[0, 1]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eye[[1, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eye[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn invert_singular_fails() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            invert(a.view(), "B"),
            Err(LinalgError::SingularMatrix { what: "B", dim: 2 })
        ));
    }

    #[test]
    fn invert_non_square_fails() {
        let a = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            invert(a.view(), "C"),
            Err(LinalgError::DimensionMismatch { .. })
        ));
    }
}
