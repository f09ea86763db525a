//! Truncation policy for the SVD of the measurement matrix.

use crate::error::LinalgError;

/// How many singular triplets of `S` to keep.
///
/// The two policies are mutually exclusive: configuring one replaces the
/// other, so the last setter called wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Truncation {
    /// Keep the leading singular values until this fraction of the total
    /// energy `Σσ²` is reached. Must lie in `(0, 1]`.
    Energy(f64),
    /// Keep exactly this many singular values (clamped to `min(nrobs, nens)`).
    /// Must be at least 1.
    Components(usize),
}

impl Default for Truncation {
    /// `Energy(0.98)`.
    fn default() -> Self {
        Truncation::Energy(0.98)
    }
}

impl Truncation {
    /// Returns the energy fraction, if this is an energy policy.
    pub fn energy(&self) -> Option<f64> {
        match *self {
            Truncation::Energy(f) => Some(f),
            Truncation::Components(_) => None,
        }
    }

    /// Returns the fixed subspace dimension, if this is a component policy.
    pub fn components(&self) -> Option<usize> {
        match *self {
            Truncation::Energy(_) => None,
            Truncation::Components(n) => Some(n),
        }
    }

    /// Applies a signed component count.
    ///
    /// A positive `ncomp` selects `Components(ncomp)`. Zero or a negative
    /// value means "unset": an energy policy is kept and a fixed count falls
    /// back to the default energy fraction.
    pub fn with_ncomp(self, ncomp: i64) -> Self {
        match usize::try_from(ncomp) {
            Ok(n) if n > 0 => Truncation::Components(n),
            _ => match self {
                Truncation::Energy(_) => self,
                Truncation::Components(_) => Truncation::default(),
            },
        }
    }

    /// Validates the policy.
    pub fn validate(&self) -> Result<(), LinalgError> {
        match *self {
            Truncation::Energy(f) if !f.is_finite() || f <= 0.0 || f > 1.0 => {
                Err(LinalgError::InvalidTruncation {
                    reason: format!("energy fraction must be in (0, 1], got {f}"),
                })
            }
            Truncation::Components(0) => Err(LinalgError::InvalidTruncation {
                reason: "subspace dimension must be >= 1".to_string(),
            }),
            _ => Ok(()),
        }
    }
}
