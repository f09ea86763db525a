//! Error types for the ert-linalg crate.

/// Error type for all fallible operations in the ert-linalg crate.
///
/// Every variant is fatal for the analysis cycle that raised it; none of
/// the kernels retry or return partial results.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LinalgError {
    /// Returned when a matrix has zero rows or zero columns.
    #[error("{what} is empty ({rows}x{cols})")]
    EmptyMatrix {
        /// Name of the offending matrix.
        what: &'static str,
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// Returned when two operands have incompatible shapes.
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

    /// Returned when a matrix contains NaN or infinity.
    #[error("{what} contains non-finite values")]
    NonFiniteInput {
        /// Name of the offending matrix.
        what: &'static str,
    },

    /// Returned when the singular value decomposition fails to converge.
    #[error("SVD did not converge for a {rows}x{cols} matrix")]
    SvdNotConverged {
        /// Number of rows of the decomposed matrix.
        rows: usize,
        /// Number of columns of the decomposed matrix.
        cols: usize,
    },

    /// Returned when a matrix that must be inverted is singular.
    #[error("{what} is singular ({dim}x{dim})")]
    SingularMatrix {
        /// Name of the offending matrix.
        what: &'static str,
        /// Matrix dimension.
        dim: usize,
    },

    /// Returned when a truncation policy is out of range.
    #[error("invalid truncation: {reason}")]
    InvalidTruncation {
        /// Description of the problem.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_empty_matrix() {
        let err = LinalgError::EmptyMatrix {
            what: "S",
            rows: 0,
            cols: 4,
        };
        assert_eq!(err.to_string(), "S is empty (0x4)");
    }

    #[test]
    fn error_dimension_mismatch() {
        let err = LinalgError::DimensionMismatch {
            what: "R",
            expected_rows: 3,
            expected_cols: 3,
            rows: 3,
            cols: 2,
        };
        assert_eq!(err.to_string(), "R: expected 3x3, got 3x2");
    }

    #[test]
    fn error_non_finite() {
        let err = LinalgError::NonFiniteInput { what: "S" };
        assert_eq!(err.to_string(), "S contains non-finite values");
    }

    #[test]
    fn error_svd_not_converged() {
        let err = LinalgError::SvdNotConverged { rows: 10, cols: 5 };
        assert_eq!(err.to_string(), "SVD did not converge for a 10x5 matrix");
    }

    #[test]
    fn error_singular() {
        let err = LinalgError::SingularMatrix {
            what: "SigZp",
            dim: 2,
        };
        assert_eq!(err.to_string(), "SigZp is singular (2x2)");
    }

    #[test]
    fn error_invalid_truncation() {
        let err = LinalgError::InvalidTruncation {
            reason: "energy fraction must be in (0, 1], got 1.5".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid truncation: energy fraction must be in (0, 1], got 1.5"
        );
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<LinalgError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<LinalgError>();
    }
}
