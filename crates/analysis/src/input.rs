//! Borrowed bundle of the observation-side matrices for one update.

use ndarray::ArrayView2;

use crate::error::AnalysisError;

/// Observation-side inputs to an analysis update.
///
/// | Field | Shape | Meaning |
/// |-------|-------|---------|
/// | `s` | `nrobs × nens` | simulated responses |
/// | `r` | `nrobs × nrobs` | observation-error covariance |
/// | `d_obs` | `nrobs × 2` | observed value and its standard deviation |
/// | `e` | `nrobs × nens` | observation perturbations |
/// | `d` | `nrobs × nens` | innovations (perturbed observations minus `S`) |
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    /// Simulated responses `S`.
    pub s: ArrayView2<'a, f64>,
    /// Observation-error covariance `R`.
    pub r: ArrayView2<'a, f64>,
    /// Observations and their errors.
    pub d_obs: ArrayView2<'a, f64>,
    /// Observation perturbations `E`.
    pub e: ArrayView2<'a, f64>,
    /// Innovations `D`.
    pub d: ArrayView2<'a, f64>,
}

impl<'a> AnalysisInput<'a> {
    /// Bundles the five matrices. Shapes are checked by [`validate`](Self::validate).
    pub fn new(
        s: ArrayView2<'a, f64>,
        r: ArrayView2<'a, f64>,
        d_obs: ArrayView2<'a, f64>,
        e: ArrayView2<'a, f64>,
        d: ArrayView2<'a, f64>,
    ) -> Self {
        Self { s, r, d_obs, e, d }
    }

    /// Number of observations (rows of `S`).
    pub fn nrobs(&self) -> usize {
        self.s.nrows()
    }

    /// Ensemble size (columns of `S`).
    pub fn ens_size(&self) -> usize {
        self.s.ncols()
    }

    /// `min(nrobs, nens)`.
    pub fn nrmin(&self) -> usize {
        self.nrobs().min(self.ens_size())
    }

    /// Same input with `S` replaced, used for resampled passes.
    pub fn with_s<'b>(&self, s: ArrayView2<'b, f64>) -> AnalysisInput<'b>
    where
        'a: 'b,
    {
        AnalysisInput {
            s,
            r: self.r.reborrow(),
            d_obs: self.d_obs.reborrow(),
            e: self.e.reborrow(),
            d: self.d.reborrow(),
        }
    }

    /// Checks that all matrices agree with the shape of `S`.
    ///
    /// `d_obs` may be empty; modules in this crate never read it.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let (nrobs, nens) = self.s.dim();
        if nrobs == 0 || nens == 0 {
            return Err(mismatch("S", 1, 1, nrobs, nens));
        }
        check(self.r, "R", nrobs, nrobs)?;
        check(self.e, "E", nrobs, nens)?;
        check(self.d, "D", nrobs, nens)?;
        if !self.d_obs.is_empty() {
            check(self.d_obs, "dObs", nrobs, 2)?;
        }
        Ok(())
    }

    /// Checks that the ensemble `A` has one column per realization.
    pub fn validate_ensemble(&self, a: ArrayView2<'_, f64>) -> Result<(), AnalysisError> {
        if a.ncols() != self.ens_size() || a.nrows() == 0 {
            return Err(mismatch(
                "A",
                a.nrows().max(1),
                self.ens_size(),
                a.nrows(),
                a.ncols(),
            ));
        }
        Ok(())
    }
}

fn mismatch(
    what: &'static str,
    expected_rows: usize,
    expected_cols: usize,
    rows: usize,
    cols: usize,
) -> AnalysisError {
    AnalysisError::DimensionMismatch {
        what,
        expected_rows,
        expected_cols,
        rows,
        cols,
    }
}

fn check(
    m: ArrayView2<'_, f64>,
    what: &'static str,
    rows: usize,
    cols: usize,
) -> Result<(), AnalysisError> {
    if m.dim() == (rows, cols) {
        Ok(())
    } else {
        Err(mismatch(what, rows, cols, m.nrows(), m.ncols()))
    }
}
