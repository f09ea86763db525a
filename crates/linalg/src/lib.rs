//! Linear-algebra kernels for ensemble Kalman filter updates.
//!
//! All matrices are `ndarray::Array2<f64>`; decompositions are delegated to
//! nalgebra inside [`dense`].
//!
//! | Kernel | Computes |
//! |--------|----------|
//! | [`svd_truncated`] | `S ≈ U₀ Σ₀ V₀ᵀ` with energy or fixed-rank truncation |
//! | [`cee`] | `B = (N−1) Σ₀⁺ U₀ᵀ R U₀ Σ₀⁺` |
//! | [`lowrank_cinv`] | `(S Sᵀ + (N−1) R)⁻¹ ≈ W diag(eig) Wᵀ` |
//! | [`init_std_x`] | `X = Sᵀ W diag(eig) Wᵀ D` (+ `I`) |
//! | [`par_matmul`] | `A · X` split over rows |
//!
//! # Quick start
//!
//! ```
//! use ert_linalg::{Truncation, init_std_x, lowrank_cinv, subtract_row_mean};
//! use ndarray::array;
//!
//! let mut s = array![[1.0, 2.0, 3.0, 4.0], [2.0, 1.0, 0.0, 1.0]];
//! subtract_row_mean(&mut s);
//! let r = ndarray::Array2::<f64>::eye(2);
//! let d = ndarray::Array2::<f64>::zeros((2, 4));
//!
//! let cinv = lowrank_cinv(s.view(), r.view(), Truncation::Energy(0.99)).unwrap();
//! let x = init_std_x(s.view(), d.view(), cinv.w().view(), cinv.eig().view(), true).unwrap();
//! assert_eq!(x.dim(), (4, 4));
//! ```

pub mod dense;
pub mod error;
pub mod lowrank;
pub mod svd;
pub mod truncation;
pub mod update;

pub use dense::{Svd, invert, svd};
pub use error::LinalgError;
pub use lowrank::{LowRankCinv, cee, lowrank_cinv};
pub use svd::{TruncatedSvd, num_significant, svd_truncated};
pub use truncation::Truncation;
pub use update::{init_std_x, par_matmul, row_mean, subtract_row_mean};
