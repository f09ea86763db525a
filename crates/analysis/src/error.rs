//! Error types for the ert-analysis crate.

use ert_linalg::LinalgError;

/// Error type for all fallible operations in the ert-analysis crate.
///
/// Any error aborts the current analysis cycle; the ensemble passed to
/// `update_a` is left untouched.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    /// Linear-algebra failure (SVD, inversion, shapes).
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// Returned when an input matrix does not match the ensemble layout.
    #[error("{what}: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    DimensionMismatch {
        /// Name of the offending matrix.
        what: &'static str,
        /// Expected number of rows.
        expected_rows: usize,
        /// Expected number of columns.
        expected_cols: usize,
        /// Actual number of rows.
        rows: usize,
        /// Actual number of columns.
        cols: usize,
    },

    /// Returned when `init_x` is called before `init_update`.
    #[error("init_update must be called before init_x")]
    InitUpdateMissing,

    /// Returned when `init_update` is called twice without `complete_update`.
    #[error("init_update called twice without complete_update")]
    InitUpdateRepeated,

    /// Returned when the ensemble is too small for the requested number of
    /// cross-validation folds.
    #[error("ensemble size {ens_size} is smaller than the number of folds {nfolds}")]
    InsufficientEnsemble {
        /// Number of realizations.
        ens_size: usize,
        /// Requested number of folds.
        nfolds: usize,
    },

    /// Returned when there are too few components for a subspace search.
    #[error("cross-validation needs at least 2 components, got {nrmin}")]
    InsufficientComponents {
        /// `min(nrobs, nens)`, or the retained count when truncation keeps fewer.
        nrmin: usize,
    },

    /// Returned when a module parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when a module is asked for an entry point it does not provide.
    #[error("{module} does not support {operation}")]
    UnsupportedOperation {
        /// Module name.
        module: &'static str,
        /// Requested operation.
        operation: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_linalg_transparent() {
        let err = AnalysisError::from(LinalgError::SingularMatrix {
            what: "SigZp",
            dim: 3,
        });
        assert_eq!(err.to_string(), "SigZp is singular (3x3)");
    }

    #[test]
    fn error_dimension_mismatch() {
        let err = AnalysisError::DimensionMismatch {
            what: "D",
            expected_rows: 4,
            expected_cols: 10,
            rows: 4,
            cols: 9,
        };
        assert_eq!(err.to_string(), "D: expected 4x10, got 4x9");
    }

    #[test]
    fn error_init_update_messages() {
        assert_eq!(
            AnalysisError::InitUpdateMissing.to_string(),
            "init_update must be called before init_x"
        );
        assert_eq!(
            AnalysisError::InitUpdateRepeated.to_string(),
            "init_update called twice without complete_update"
        );
    }

    #[test]
    fn error_insufficient_ensemble() {
        let err = AnalysisError::InsufficientEnsemble {
            ens_size: 5,
            nfolds: 10,
        };
        assert_eq!(
            err.to_string(),
            "ensemble size 5 is smaller than the number of folds 10"
        );
    }

    #[test]
    fn error_insufficient_components() {
        let err = AnalysisError::InsufficientComponents { nrmin: 1 };
        assert_eq!(
            err.to_string(),
            "cross-validation needs at least 2 components, got 1"
        );
    }

    #[test]
    fn error_unsupported() {
        let err = AnalysisError::UnsupportedOperation {
            module: "STD_ENKF",
            operation: "update_a",
        };
        assert_eq!(err.to_string(), "STD_ENKF does not support update_a");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<AnalysisError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<AnalysisError>();
    }
}
