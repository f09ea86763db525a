//! Update-matrix construction and the data-parallel `A·X` product.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use crate::error::LinalgError;

fn expect_dim(
    m: ArrayView2<'_, f64>,
    what: &'static str,
    rows: usize,
    cols: usize,
) -> Result<(), LinalgError> {
    if m.dim() != (rows, cols) {
        return Err(LinalgError::DimensionMismatch {
            what,
            expected_rows: rows,
            expected_cols: cols,
            rows: m.nrows(),
            cols: m.ncols(),
        });
    }
    Ok(())
}

/// Row means of `m` (one entry per row). Empty rows give 0.0.
pub fn row_mean(m: ArrayView2<'_, f64>) -> Array1<f64> {
    m.mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(m.nrows()))
}

/// Subtracts the row mean from every row of `m` in place.
pub fn subtract_row_mean(m: &mut Array2<f64>) {
    let means = row_mean(m.view());
    for (mut row, mean) in m.rows_mut().into_iter().zip(means.iter()) {
        row.mapv_inplace(|v| v - mean);
    }
}

/// Builds the standard EnKF update matrix
/// `X = Sᵀ · W · diag(eig) · Wᵀ · D` (`nens × nens`).
///
/// With `with_identity` the identity is added, giving the full transform
/// `A_new = A · X`; without it `X` is only the correction, as used by the
/// bootstrap update `A_res · X + A0`.
///
/// # Errors
///
/// Returns [`LinalgError::DimensionMismatch`] if `D`, `W` or `eig` do not
/// match the shape of `S`.
pub fn init_std_x(
    s: ArrayView2<'_, f64>,
    d: ArrayView2<'_, f64>,
    w: ArrayView2<'_, f64>,
    eig: ArrayView1<'_, f64>,
    with_identity: bool,
) -> Result<Array2<f64>, LinalgError> {
    let (nrobs, nens) = s.dim();
    let nrmin = w.ncols();
    expect_dim(d, "D", nrobs, nens)?;
    expect_dim(w, "W", nrobs, nrmin)?;
    if eig.len() != nrmin {
        return Err(LinalgError::DimensionMismatch {
            what: "eig",
            expected_rows: nrmin,
            expected_cols: 1,
            rows: eig.len(),
            cols: 1,
        });
    }

    // X1 = diag(eig) * W'
    let mut x1 = w.t().to_owned();
    for (mut row, &e) in x1.rows_mut().into_iter().zip(eig.iter()) {
        row.mapv_inplace(|v| v * e);
    }
    let x2 = x1.dot(&d);
    let x3 = w.dot(&x2);
    let mut x = s.t().dot(&x3);

    if with_identity {
        for i in 0..nens {
            x[[i, i]] += 1.0;
        }
    }
    Ok(x)
}

/// Computes `A · X`, splitting the rows of `A` across the rayon pool.
///
/// # Errors
///
/// Returns [`LinalgError::DimensionMismatch`] if the inner dimensions differ.
pub fn par_matmul(a: ArrayView2<'_, f64>, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, LinalgError> {
    if a.ncols() != x.nrows() {
        return Err(LinalgError::DimensionMismatch {
            what: "X",
            expected_rows: a.ncols(),
            expected_cols: x.ncols(),
            rows: x.nrows(),
            cols: x.ncols(),
        });
    }
    let mut out = Array2::zeros((a.nrows(), x.ncols()));
    Zip::from(out.rows_mut())
        .and(a.rows())
        .par_for_each(|mut out_row, a_row| out_row.assign(&a_row.dot(&x)));
    Ok(out)
}
