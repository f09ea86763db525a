//! Ensemble Kalman filter analysis modules.
//!
//! Three modules compute the ensemble update from simulated responses `S`,
//! observation errors `R` and innovations `D`:
//!
//! | Module | Entry point | Subspace dimension |
//! |--------|-------------|--------------------|
//! | [`StdEnkf`] | `init_x` | energy fraction or fixed |
//! | [`CvEnkf`] | `init_update` → `init_x` → `complete_update` | m-fold cross-validation |
//! | [`BootstrapEnkf`] | `update_a` | per resampled pass |
//!
//! [`AnalysisModule`] wraps them behind one interface, with named parameters
//! (see [`params`]) and capability flags ([`ModuleOptions`]).
//!
//! Randomness (fold shuffles, bootstrap draws) always comes from a caller
//! supplied `&mut impl Rng`; two runs with the same seed give the same update.
//!
//! # Quick start
//!
//! ```
//! use ert_analysis::{AnalysisInput, AnalysisModule, ModuleKind};
//! use ndarray::Array2;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let s = Array2::from_shape_fn((3, 6), |(i, j)| ((i + 1) * j) as f64 + (j % 2) as f64);
//! let r = Array2::<f64>::eye(3);
//! let d_obs = Array2::<f64>::zeros((3, 2));
//! let d = Array2::from_elem((3, 6), 0.1);
//! let input = AnalysisInput::new(s.view(), r.view(), d_obs.view(), d.view(), d.view());
//! let mut a = Array2::from_shape_fn((4, 6), |(i, j)| (i * j) as f64);
//!
//! let mut module = AnalysisModule::new(ModuleKind::Std);
//! let mut rng = StdRng::seed_from_u64(42);
//! module.run_update(&mut a, &input, &mut rng).unwrap();
//! assert_eq!(a.dim(), (4, 6));
//! ```

pub mod bootstrap_enkf;
pub mod cv_enkf;
pub mod error;
pub mod input;
pub mod module;
pub mod options;
pub mod params;
pub mod std_enkf;

pub use bootstrap_enkf::{BootstrapEnkf, ResampleTable};
pub use cv_enkf::{CvEnkf, SubspaceSelection};
pub use error::AnalysisError;
pub use input::AnalysisInput;
pub use module::{AnalysisModule, ModuleKind};
pub use options::ModuleOptions;
pub use std_enkf::StdEnkf;

pub use ert_linalg::Truncation;
