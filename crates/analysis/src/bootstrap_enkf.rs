//! Bootstrap-resampled EnKF.
//!
//! Every output member `m` gets its own analysis: the ensemble is resampled
//! with replacement, an update matrix is computed from the resampled
//! responses, and column `m` of `A_res·X + A0` becomes the updated member.

use ert_linalg::par_matmul;
use ndarray::{Array2, Axis, s};
use rand::Rng;
use tracing::{debug, info};

use crate::cv_enkf::CvEnkf;
use crate::error::AnalysisError;
use crate::input::AnalysisInput;
use crate::options::ModuleOptions;
use crate::params::BOOTSTRAP_DO_CV;
use crate::std_enkf::StdEnkf;

/// Resampling indices: row `m` lists the members drawn for output column `m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleTable {
    rows: Vec<Vec<usize>>,
}

impl ResampleTable {
    /// Draws `ens_size` independent resamples of size `ens_size`, uniform
    /// with replacement.
    pub fn draw<R: Rng + ?Sized>(ens_size: usize, rng: &mut R) -> Self {
        let rows = (0..ens_size)
            .map(|_| (0..ens_size).map(|_| rng.random_range(0..ens_size)).collect())
            .collect();
        Self { rows }
    }

    /// Builds a table from explicit rows.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] unless the table is square and
    /// every index is a valid member.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Result<Self, AnalysisError> {
        let n = rows.len();
        for (m, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(AnalysisError::InvalidConfig(format!(
                    "resample row {m} has {} entries, expected {n}",
                    row.len()
                )));
            }
            if let Some(&bad) = row.iter().find(|&&i| i >= n) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "resample row {m} references member {bad} of {n}"
                )));
            }
        }
        Ok(Self { rows })
    }

    /// Ensemble size.
    pub fn ens_size(&self) -> usize {
        self.rows.len()
    }

    /// Indices drawn for output column `m`.
    ///
    /// # Panics
    ///
    /// Panics if `m >= ens_size()`.
    pub fn row(&self, m: usize) -> &[usize] {
        assert!(
            m < self.rows.len(),
            "resample row {m} out of range for ensemble size {}",
            self.rows.len()
        );
        &self.rows[m]
    }

    /// Number of distinct members in row `m`.
    ///
    /// # Panics
    ///
    /// Panics if `m >= ens_size()`.
    pub fn unique_count(&self, m: usize) -> usize {
        let mut seen = vec![false; self.rows.len()];
        let mut count = 0;
        for &i in self.row(m) {
            if !seen[i] {
                seen[i] = true;
                count += 1;
            }
        }
        count
    }
}

/// Bootstrap EnKF, driving either [`StdEnkf`] or [`CvEnkf`] per pass.
#[derive(Debug, Clone, Default)]
pub struct BootstrapEnkf {
    std: StdEnkf,
    cv: CvEnkf,
    do_cv: bool,
}

impl BootstrapEnkf {
    /// Name used in configuration files and logs.
    pub const NAME: &'static str = "BOOTSTRAP_ENKF";

    /// Creates a module with default inner modules and `do_cv = false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the cross-validated inner module.
    pub fn with_do_cv(mut self, do_cv: bool) -> Self {
        self.do_cv = do_cv;
        self
    }

    /// Replaces the inner standard module.
    pub fn with_std(mut self, std: StdEnkf) -> Self {
        self.std = std;
        self
    }

    /// Replaces the inner cross-validated module.
    pub fn with_cv(mut self, cv: CvEnkf) -> Self {
        self.cv = cv;
        self
    }

    /// Returns whether each pass uses cross-validation.
    pub fn do_cv(&self) -> bool {
        self.do_cv
    }

    /// Inner standard module.
    pub fn std_enkf(&self) -> &StdEnkf {
        &self.std
    }

    /// Inner cross-validated module.
    pub fn cv_enkf(&self) -> &CvEnkf {
        &self.cv
    }

    /// Flags advertised to the orchestrator.
    pub fn options(&self) -> ModuleOptions {
        ModuleOptions::NEED_ED | ModuleOptions::UPDATE_A
    }

    /// Updates `a` in place using a freshly drawn [`ResampleTable`].
    ///
    /// # Errors
    ///
    /// See [`update_a_with_table`](Self::update_a_with_table).
    pub fn update_a<R: Rng + ?Sized>(
        &self,
        a: &mut Array2<f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
    ) -> Result<(), AnalysisError> {
        let table = ResampleTable::draw(input.ens_size(), rng);
        self.update_a_with_table(a, input, &table, rng)
    }

    /// Updates `a` in place with the given resampling indices.
    ///
    /// `rng` is only used for the fold shuffles of the cross-validated
    /// variant. `a` is overwritten only if every pass succeeds.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`AnalysisError::DimensionMismatch`] | `a`, the inputs or the table disagree on the ensemble size |
    /// | [`AnalysisError::InvalidConfig`] | a CV pass has fewer than 2 distinct members |
    /// | [`AnalysisError::Linalg`] | a pass hits a numerical failure |
    pub fn update_a_with_table<R: Rng + ?Sized>(
        &self,
        a: &mut Array2<f64>,
        input: &AnalysisInput<'_>,
        table: &ResampleTable,
        rng: &mut R,
    ) -> Result<(), AnalysisError> {
        input.validate()?;
        input.validate_ensemble(a.view())?;
        let ens_size = input.ens_size();
        if table.ens_size() != ens_size {
            return Err(AnalysisError::DimensionMismatch {
                what: "resample table",
                expected_rows: ens_size,
                expected_cols: ens_size,
                rows: table.ens_size(),
                cols: table.ens_size(),
            });
        }

        let a0 = a.view();
        let mut updated = Array2::zeros(a.dim());
        for m in 0..ens_size {
            let idx = table.row(m);
            let unique = table.unique_count(m);
            let a_res = a0.select(Axis(1), idx);
            let s_res = input.s.select(Axis(1), idx);
            let input_res = input.with_s(s_res.view());

            let x = if self.do_cv {
                let mut cv = self.cv.clone().with_nfolds(self.cv.nfolds().min(unique));
                cv.init_update(&input_res)?;
                let x = cv.correction_x(a_res.view(), &input_res, rng);
                cv.complete_update();
                x?
            } else {
                self.std.correction_x(&input_res)?
            };

            let column = par_matmul(a_res.view(), x.slice(s![.., m..m + 1]))?;
            let mut out = updated.column_mut(m);
            out.assign(&column.column(0));
            out += &a0.column(m);
            debug!(pass = m, unique, "bootstrap pass");
        }

        a.assign(&updated);
        info!(ens_size, do_cv = self.do_cv, "bootstrap update applied");
        Ok(())
    }

    pub(crate) fn set_double(&mut self, name: &str, value: f64) -> bool {
        let a = self.std.set_double(name, value);
        let b = self.cv.set_double(name, value);
        a || b
    }

    pub(crate) fn set_int(&mut self, name: &str, value: i64) -> bool {
        let a = self.std.set_int(name, value);
        let b = self.cv.set_int(name, value);
        a || b
    }

    pub(crate) fn set_bool(&mut self, name: &str, value: bool) -> bool {
        match name {
            BOOTSTRAP_DO_CV => {
                self.do_cv = value;
                true
            }
            _ => self.cv.set_bool(name, value),
        }
    }

    pub(crate) fn get_double(&self, name: &str) -> Option<f64> {
        self.std.get_double(name).or_else(|| self.cv.get_double(name))
    }

    pub(crate) fn get_int(&self, name: &str) -> Option<i64> {
        self.std.get_int(name).or_else(|| self.cv.get_int(name))
    }

    pub(crate) fn get_bool(&self, name: &str) -> Option<bool> {
        match name {
            BOOTSTRAP_DO_CV => Some(self.do_cv),
            _ => self.cv.get_bool(name),
        }
    }

    pub(crate) fn has_var(name: &str) -> bool {
        name == BOOTSTRAP_DO_CV || StdEnkf::has_var(name) || CvEnkf::has_var(name)
    }
}
