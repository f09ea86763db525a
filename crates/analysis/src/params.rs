//! Names of the configurable module parameters.

/// Energy fraction kept by the truncated SVD (double).
pub const ENKF_TRUNCATION: &str = "ENKF_TRUNCATION";
/// Fixed subspace dimension (int); overrides the energy fraction.
pub const ENKF_NCOMP: &str = "ENKF_NCOMP";
/// Number of cross-validation folds (int).
pub const CV_NFOLDS: &str = "CV_NFOLDS";
/// Use the penalised PRESS (one-standard-error) rule (bool).
pub const CV_PEN_PRESS: &str = "CV_PEN_PRESS";
/// Let the bootstrap module use cross-validation for each pass (bool).
pub const BOOTSTRAP_DO_CV: &str = "BOOTSTRAP_DO_CV";
