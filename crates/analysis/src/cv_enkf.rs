//! EnKF update with the subspace dimension chosen by m-fold cross-validation.
//!
//! # Algorithm
//!
//! ```text
//! init_update:  S' = S − mean(S)         S' = U₀ Σ₀ V₀ᵀ
//!               Z  = Σ₀ V₀ᵀ               (nrmin × nens)
//!               Rp = U₀ᵀ R U₀             (nrmin × nrmin)
//!               Dp = U₀ᵀ D                (nrmin × nens)
//!
//! init_x:       p  = select_subspace(A)   (cross-validated)
//!               SigZp = Zp Zpᵀ + (N−1) Rp
//!               X  = I + Zpᵀ SigZp⁻¹ Dp
//! ```

use ert_linalg::{Truncation, invert, subtract_row_mean, svd_truncated};
use ndarray::{Array2, ArrayView2, Axis, s};
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::input::AnalysisInput;
use crate::options::ModuleOptions;
use crate::params::{CV_NFOLDS, CV_PEN_PRESS, ENKF_NCOMP, ENKF_TRUNCATION};

/// Projected matrices of one analysis cycle.
#[derive(Debug, Clone)]
struct CvCycle {
    z: Array2<f64>,
    rp: Array2<f64>,
    dp: Array2<f64>,
    /// Rows of `z` that are not zeroed by truncation.
    num_significant: usize,
}

impl CvCycle {
    fn nrmin(&self) -> usize {
        self.z.nrows()
    }

    fn ens_size(&self) -> usize {
        self.z.ncols()
    }
}

#[derive(Debug, Clone, Default)]
enum CvState {
    #[default]
    Uninitialized,
    Ready(CvCycle),
}

/// Outcome of the cross-validated subspace search.
#[derive(Debug, Clone, PartialEq)]
pub struct SubspaceSelection {
    /// Chosen subspace dimension, `1 ≤ opt_p ≤ max_p`.
    pub opt_p: usize,
    /// Number of candidate dimensions searched.
    pub max_p: usize,
    /// Mean prediction error across folds, per candidate (`max_p`).
    pub mean_error: Vec<f64>,
    /// Standard deviation of the prediction error across folds (`max_p`).
    pub std_error: Vec<f64>,
}

/// Cross-validated EnKF.
///
/// Must be driven through `init_update` → `init_x` (any number of times) →
/// `complete_update`. The projected matrices live between the two brackets
/// and are dropped by [`complete_update`](Self::complete_update).
#[derive(Debug, Clone)]
pub struct CvEnkf {
    truncation: Truncation,
    nfolds: usize,
    penalised_press: bool,
    state: CvState,
}

impl Default for CvEnkf {
    fn default() -> Self {
        Self::new()
    }
}

impl CvEnkf {
    /// Name used in configuration files and logs.
    pub const NAME: &'static str = "CV_ENKF";

    /// Creates a module.
    ///
    /// Defaults: `truncation = Energy(0.98)`, `nfolds = 10`,
    /// `penalised_press = false`.
    pub fn new() -> Self {
        Self {
            truncation: Truncation::default(),
            nfolds: 10,
            penalised_press: false,
            state: CvState::Uninitialized,
        }
    }

    /// Sets the truncation policy.
    pub fn with_truncation(mut self, truncation: Truncation) -> Self {
        self.truncation = truncation;
        self
    }

    /// Sets the number of cross-validation folds.
    pub fn with_nfolds(mut self, nfolds: usize) -> Self {
        self.nfolds = nfolds;
        self
    }

    /// Enables the penalised PRESS selection rule.
    pub fn with_penalised_press(mut self, penalised_press: bool) -> Self {
        self.penalised_press = penalised_press;
        self
    }

    /// Returns the truncation policy.
    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    /// Returns the number of folds.
    pub fn nfolds(&self) -> usize {
        self.nfolds
    }

    /// Returns whether the penalised PRESS rule is used.
    pub fn penalised_press(&self) -> bool {
        self.penalised_press
    }

    /// Keeps singular values up to this energy fraction.
    pub fn set_truncation(&mut self, fraction: f64) {
        self.truncation = Truncation::Energy(fraction);
    }

    /// Keeps exactly `n` singular values.
    pub fn set_subspace_dimension(&mut self, n: usize) {
        self.truncation = Truncation::Components(n);
    }

    /// Sets the number of folds.
    pub fn set_nfolds(&mut self, nfolds: usize) {
        self.nfolds = nfolds;
    }

    /// Enables or disables the penalised PRESS rule.
    pub fn set_penalised_press(&mut self, on: bool) {
        self.penalised_press = on;
    }

    /// Flags advertised to the orchestrator.
    pub fn options(&self) -> ModuleOptions {
        ModuleOptions::NEED_ED | ModuleOptions::USE_A | ModuleOptions::INIT_UPDATE
    }

    /// Returns true between `init_update` and `complete_update`.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, CvState::Ready(_))
    }

    /// Computes `Z`, `Rp` and `Dp` for this cycle.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`AnalysisError::InitUpdateRepeated`] | the previous cycle was not completed |
    /// | [`AnalysisError::InvalidConfig`] | fewer than 2 folds |
    /// | [`AnalysisError::InsufficientEnsemble`] | `nens < nfolds` |
    /// | [`AnalysisError::DimensionMismatch`] | inconsistent input shapes |
    pub fn init_update(&mut self, input: &AnalysisInput<'_>) -> Result<(), AnalysisError> {
        if self.is_ready() {
            return Err(AnalysisError::InitUpdateRepeated);
        }
        if self.nfolds < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.nfolds
            )));
        }
        let ens_size = input.ens_size();
        if ens_size < self.nfolds {
            return Err(AnalysisError::InsufficientEnsemble {
                ens_size,
                nfolds: self.nfolds,
            });
        }
        input.validate()?;

        let mut s = input.s.to_owned();
        subtract_row_mean(&mut s);
        let svd = svd_truncated(s.view(), self.truncation, true)?;
        let num_significant = svd.num_significant();

        let v0t = svd
            .v0t()
            .ok_or(ert_linalg::LinalgError::SvdNotConverged {
                rows: input.nrobs(),
                cols: ens_size,
            })?;
        // Z = Σ₀ V₀ᵀ, zero beyond the retained components.
        let mut z = v0t.to_owned();
        for (i, mut row) in z.rows_mut().into_iter().enumerate() {
            let sigma = if svd.inv_sig0()[i] > 0.0 {
                svd.sig0()[i]
            } else {
                0.0
            };
            row.mapv_inplace(|v| v * sigma);
        }

        let u0 = svd.u0();
        let rp = u0.t().dot(&input.r).dot(u0);
        let dp = u0.t().dot(&input.d);

        debug!(
            nrobs = input.nrobs(),
            ens_size,
            nrmin = svd.nrmin(),
            num_significant,
            "cv_enkf init_update"
        );
        self.state = CvState::Ready(CvCycle {
            z,
            rp,
            dp,
            num_significant,
        });
        Ok(())
    }

    fn cycle(&self) -> Result<&CvCycle, AnalysisError> {
        match &self.state {
            CvState::Ready(cycle) => Ok(cycle),
            CvState::Uninitialized => Err(AnalysisError::InitUpdateMissing),
        }
    }

    /// Cross-validates the subspace dimension against the ensemble `A`.
    ///
    /// Members are shuffled with `rng`; fold `f` holds out members
    /// `perm[f], perm[f + nfolds], …`. Folds are evaluated in parallel.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`AnalysisError::InitUpdateMissing`] | called outside an update cycle |
    /// | [`AnalysisError::InsufficientComponents`] | `nrmin < 2`, or truncation kept no component |
    /// | [`AnalysisError::DimensionMismatch`] | `A` has the wrong number of columns |
    /// | [`AnalysisError::Linalg`] | a fold matrix is singular |
    pub fn select_subspace<R: Rng + ?Sized>(
        &self,
        a: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> Result<SubspaceSelection, AnalysisError> {
        let cycle = self.cycle()?;
        let ens_size = cycle.ens_size();
        if a.ncols() != ens_size || a.nrows() == 0 {
            return Err(AnalysisError::DimensionMismatch {
                what: "A",
                expected_rows: a.nrows().max(1),
                expected_cols: ens_size,
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let nrmin = cycle.nrmin();
        // Candidates stop one short of nrmin and never pass the truncation.
        let max_p = cycle.num_significant.min(nrmin.saturating_sub(1));
        if max_p < 1 {
            return Err(AnalysisError::InsufficientComponents {
                nrmin: cycle.num_significant.min(nrmin),
            });
        }
        let nfolds = self.nfolds.min(ens_size);

        let mut perm: Vec<usize> = (0..ens_size).collect();
        perm.shuffle(rng);

        let mut a_centred = a.to_owned();
        subtract_row_mean(&mut a_centred);
        let scale = (ens_size - 1) as f64;

        let fold_errors: Vec<Vec<f64>> = (0..nfolds)
            .into_par_iter()
            .map(|fold| {
                let test: Vec<usize> = perm.iter().skip(fold).step_by(nfolds).copied().collect();
                let train: Vec<usize> = perm
                    .iter()
                    .enumerate()
                    .filter(|(pos, _)| pos % nfolds != fold)
                    .map(|(_, &m)| m)
                    .collect();
                fold_prediction_errors(cycle, a_centred.view(), &train, &test, max_p, scale)
            })
            .collect::<Result<_, _>>()?;

        let mut mean_error = Vec::with_capacity(max_p);
        let mut std_error = Vec::with_capacity(max_p);
        for p in 0..max_p {
            let errs: Vec<f64> = fold_errors.iter().map(|fold| fold[p]).collect();
            let (m, sd) = ert_stats::mean_sd(&errs);
            mean_error.push(m);
            std_error.push(sd);
        }

        let best = ert_stats::argmin(&mean_error).unwrap_or(0);
        let chosen = if self.penalised_press {
            let limit = mean_error[best] + std_error[best];
            mean_error.iter().position(|&m| m <= limit).unwrap_or(best)
        } else {
            best
        };
        let opt_p = chosen + 1;
        info!(
            opt_p,
            max_p,
            nfolds,
            penalised = self.penalised_press,
            "cv_enkf subspace selected"
        );

        Ok(SubspaceSelection {
            opt_p,
            max_p,
            mean_error,
            std_error,
        })
    }

    /// Computes `X = I + Zpᵀ (Zp Zpᵀ + (N−1) Rp)⁻¹ Dp` with the
    /// cross-validated dimension `p`.
    ///
    /// # Errors
    ///
    /// See [`select_subspace`](Self::select_subspace); a singular `SigZp` is
    /// returned as [`AnalysisError::Linalg`].
    pub fn init_x<R: Rng + ?Sized>(
        &self,
        a: ArrayView2<'_, f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
    ) -> Result<Array2<f64>, AnalysisError> {
        self.compute_x(a, input, rng, true)
    }

    /// Same as [`init_x`](Self::init_x) without the identity.
    pub(crate) fn correction_x<R: Rng + ?Sized>(
        &self,
        a: ArrayView2<'_, f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
    ) -> Result<Array2<f64>, AnalysisError> {
        self.compute_x(a, input, rng, false)
    }

    fn compute_x<R: Rng + ?Sized>(
        &self,
        a: ArrayView2<'_, f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
        with_identity: bool,
    ) -> Result<Array2<f64>, AnalysisError> {
        let cycle = self.cycle()?;
        input.validate_ensemble(a)?;
        let selection = self.select_subspace(a, rng)?;
        let p = selection.opt_p;
        let ens_size = cycle.ens_size();

        let zp = cycle.z.slice(s![..p, ..]);
        let rp = cycle.rp.slice(s![..p, ..p]);
        let dp = cycle.dp.slice(s![..p, ..]);

        let sig_zp = zp.dot(&zp.t()) + &(&rp * (ens_size - 1) as f64);
        let sig_zp_inv = invert(sig_zp.view(), "SigZp")?;
        let w = zp.t().dot(&sig_zp_inv);
        let mut x = w.dot(&dp);
        if with_identity {
            for i in 0..ens_size {
                x[[i, i]] += 1.0;
            }
        }
        debug!(opt_p = p, ens_size, "cv_enkf update matrix");
        Ok(x)
    }

    /// Ends the cycle and drops the projected matrices. A no-op outside a
    /// cycle.
    pub fn complete_update(&mut self) {
        self.state = CvState::Uninitialized;
    }

    pub(crate) fn set_double(&mut self, name: &str, value: f64) -> bool {
        match name {
            ENKF_TRUNCATION => {
                self.set_truncation(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_int(&mut self, name: &str, value: i64) -> bool {
        match name {
            ENKF_NCOMP => {
                self.truncation = self.truncation.with_ncomp(value);
                true
            }
            CV_NFOLDS => {
                self.set_nfolds(usize::try_from(value).unwrap_or(0));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_bool(&mut self, name: &str, value: bool) -> bool {
        match name {
            CV_PEN_PRESS => {
                self.set_penalised_press(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get_double(&self, name: &str) -> Option<f64> {
        match name {
            ENKF_TRUNCATION => self.truncation.energy(),
            _ => None,
        }
    }

    pub(crate) fn get_int(&self, name: &str) -> Option<i64> {
        match name {
            ENKF_NCOMP => self
                .truncation
                .components()
                .and_then(|n| i64::try_from(n).ok()),
            CV_NFOLDS => i64::try_from(self.nfolds).ok(),
            _ => None,
        }
    }

    pub(crate) fn get_bool(&self, name: &str) -> Option<bool> {
        match name {
            CV_PEN_PRESS => Some(self.penalised_press),
            _ => None,
        }
    }

    pub(crate) fn has_var(name: &str) -> bool {
        matches!(name, ENKF_TRUNCATION | ENKF_NCOMP | CV_NFOLDS | CV_PEN_PRESS)
    }
}

/// Prediction error of one fold for every candidate dimension `1..=max_p`.
fn fold_prediction_errors(
    cycle: &CvCycle,
    a_centred: ArrayView2<'_, f64>,
    train: &[usize],
    test: &[usize],
    max_p: usize,
    scale: f64,
) -> Result<Vec<f64>, AnalysisError> {
    let z_train = cycle.z.select(Axis(1), train);
    let z_test = cycle.z.select(Axis(1), test);
    let a_train = a_centred.select(Axis(1), train);
    let a_test = a_centred.select(Axis(1), test);
    let n_test = test.len() as f64;

    let mut errors = Vec::with_capacity(max_p);
    for p in 0..max_p {
        let k = p + 1;
        let zk_train = z_train.slice(s![..k, ..]);
        let zk_test = z_test.slice(s![..k, ..]);
        let rp_k = cycle.rp.slice(s![..k, ..k]);

        let sig_dp = zk_train.dot(&zk_train.t()) + &(&rp_k * scale);
        let sig_dp_inv = invert(sig_dp.view(), "SigDp")?;
        let prediction = a_train
            .dot(&zk_train.t())
            .dot(&sig_dp_inv)
            .dot(&zk_test);
        let residual = &a_test - &prediction;
        errors.push(residual.iter().map(|v| v * v).sum::<f64>() / n_test);
    }
    debug!(n_train = train.len(), n_test = test.len(), "cv fold evaluated");
    Ok(errors)
}
