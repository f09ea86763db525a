//! Uniform entry points over the available analysis modules.

use std::fmt;
use std::str::FromStr;

use ert_linalg::par_matmul;
use ndarray::Array2;
use rand::Rng;
use tracing::info;

use crate::bootstrap_enkf::BootstrapEnkf;
use crate::cv_enkf::CvEnkf;
use crate::error::AnalysisError;
use crate::input::AnalysisInput;
use crate::options::ModuleOptions;
use crate::std_enkf::StdEnkf;

/// Identifies an analysis module by its configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// `STD_ENKF`
    Std,
    /// `CV_ENKF`
    Cv,
    /// `BOOTSTRAP_ENKF`
    Bootstrap,
}

impl ModuleKind {
    /// Configuration name of the module.
    pub fn name(self) -> &'static str {
        match self {
            ModuleKind::Std => StdEnkf::NAME,
            ModuleKind::Cv => CvEnkf::NAME,
            ModuleKind::Bootstrap => BootstrapEnkf::NAME,
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STD_ENKF" => Ok(ModuleKind::Std),
            "CV_ENKF" => Ok(ModuleKind::Cv),
            "BOOTSTRAP_ENKF" => Ok(ModuleKind::Bootstrap),
            other => Err(AnalysisError::InvalidConfig(format!(
                "unknown analysis module '{other}'"
            ))),
        }
    }
}

/// An analysis module behind one interface.
///
/// The orchestrator inspects [`options`](Self::options) to decide whether to
/// call `update_a` or the `init_update` / `init_x` / `complete_update`
/// sequence; [`run_update`](Self::run_update) does exactly that.
///
/// # Example
///
/// ```
/// use ert_analysis::{AnalysisModule, ModuleKind, params};
///
/// let mut module = AnalysisModule::new("CV_ENKF".parse::<ModuleKind>().unwrap());
/// assert!(module.set_int(params::CV_NFOLDS, 5));
/// assert_eq!(module.get_int(params::CV_NFOLDS), Some(5));
/// assert!(!module.set_int("NO_SUCH_PARAM", 1));
/// ```
#[derive(Debug, Clone)]
pub enum AnalysisModule {
    /// Standard EnKF.
    Std(StdEnkf),
    /// Cross-validated EnKF.
    Cv(CvEnkf),
    /// Bootstrap EnKF.
    Bootstrap(BootstrapEnkf),
}

impl AnalysisModule {
    /// Creates a module of the given kind with default parameters.
    pub fn new(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Std => AnalysisModule::Std(StdEnkf::new()),
            ModuleKind::Cv => AnalysisModule::Cv(CvEnkf::new()),
            ModuleKind::Bootstrap => AnalysisModule::Bootstrap(BootstrapEnkf::new()),
        }
    }

    /// Kind of this module.
    pub fn kind(&self) -> ModuleKind {
        match self {
            AnalysisModule::Std(_) => ModuleKind::Std,
            AnalysisModule::Cv(_) => ModuleKind::Cv,
            AnalysisModule::Bootstrap(_) => ModuleKind::Bootstrap,
        }
    }

    /// Configuration name of this module.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Capability flags.
    pub fn options(&self) -> ModuleOptions {
        match self {
            AnalysisModule::Std(m) => m.options(),
            AnalysisModule::Cv(m) => m.options(),
            AnalysisModule::Bootstrap(m) => m.options(),
        }
    }

    /// Sets an integer parameter. Returns `false` for unknown names.
    pub fn set_int(&mut self, name: &str, value: i64) -> bool {
        match self {
            AnalysisModule::Std(m) => m.set_int(name, value),
            AnalysisModule::Cv(m) => m.set_int(name, value),
            AnalysisModule::Bootstrap(m) => m.set_int(name, value),
        }
    }

    /// Sets a floating-point parameter. Returns `false` for unknown names.
    pub fn set_double(&mut self, name: &str, value: f64) -> bool {
        match self {
            AnalysisModule::Std(m) => m.set_double(name, value),
            AnalysisModule::Cv(m) => m.set_double(name, value),
            AnalysisModule::Bootstrap(m) => m.set_double(name, value),
        }
    }

    /// Sets a boolean parameter. Returns `false` for unknown names.
    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        match self {
            AnalysisModule::Std(_) => false,
            AnalysisModule::Cv(m) => m.set_bool(name, value),
            AnalysisModule::Bootstrap(m) => m.set_bool(name, value),
        }
    }

    /// Current value of an integer parameter, if set and known.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self {
            AnalysisModule::Std(m) => m.get_int(name),
            AnalysisModule::Cv(m) => m.get_int(name),
            AnalysisModule::Bootstrap(m) => m.get_int(name),
        }
    }

    /// Current value of a floating-point parameter, if set and known.
    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self {
            AnalysisModule::Std(m) => m.get_double(name),
            AnalysisModule::Cv(m) => m.get_double(name),
            AnalysisModule::Bootstrap(m) => m.get_double(name),
        }
    }

    /// Current value of a boolean parameter, if known.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self {
            AnalysisModule::Std(_) => None,
            AnalysisModule::Cv(m) => m.get_bool(name),
            AnalysisModule::Bootstrap(m) => m.get_bool(name),
        }
    }

    /// Returns true if the module recognises the parameter name.
    pub fn has_var(&self, name: &str) -> bool {
        match self {
            AnalysisModule::Std(_) => StdEnkf::has_var(name),
            AnalysisModule::Cv(_) => CvEnkf::has_var(name),
            AnalysisModule::Bootstrap(_) => BootstrapEnkf::has_var(name),
        }
    }

    /// Opens an update cycle. A no-op for modules without `INIT_UPDATE`.
    pub fn init_update(&mut self, input: &AnalysisInput<'_>) -> Result<(), AnalysisError> {
        match self {
            AnalysisModule::Cv(m) => m.init_update(input),
            _ => Ok(()),
        }
    }

    /// Computes the update matrix `X` with `A_new = A·X`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnsupportedOperation`] for modules that update
    /// `A` directly.
    pub fn init_x<R: Rng + ?Sized>(
        &self,
        a: ndarray::ArrayView2<'_, f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
    ) -> Result<Array2<f64>, AnalysisError> {
        match self {
            AnalysisModule::Std(m) => m.init_x(a, input),
            AnalysisModule::Cv(m) => m.init_x(a, input, rng),
            AnalysisModule::Bootstrap(_) => Err(AnalysisError::UnsupportedOperation {
                module: self.name(),
                operation: "init_x",
            }),
        }
    }

    /// Updates `a` in place.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnsupportedOperation`] for modules that only
    /// provide `init_x`.
    pub fn update_a<R: Rng + ?Sized>(
        &self,
        a: &mut Array2<f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
    ) -> Result<(), AnalysisError> {
        match self {
            AnalysisModule::Bootstrap(m) => m.update_a(a, input, rng),
            _ => Err(AnalysisError::UnsupportedOperation {
                module: self.name(),
                operation: "update_a",
            }),
        }
    }

    /// Closes an update cycle. A no-op for modules without `INIT_UPDATE`.
    pub fn complete_update(&mut self) {
        if let AnalysisModule::Cv(m) = self {
            m.complete_update();
        }
    }

    /// Runs one full analysis step on `a`, dispatching on [`options`](Self::options).
    ///
    /// `complete_update` runs whenever `init_update` succeeded, also when
    /// computing `X` fails.
    pub fn run_update<R: Rng + ?Sized>(
        &mut self,
        a: &mut Array2<f64>,
        input: &AnalysisInput<'_>,
        rng: &mut R,
    ) -> Result<(), AnalysisError> {
        let options = self.options();
        info!(module = self.name(), %options, ens_size = input.ens_size(), "analysis update");

        if options.contains(ModuleOptions::UPDATE_A) {
            return self.update_a(a, input, rng);
        }

        let bracketed = options.contains(ModuleOptions::INIT_UPDATE);
        if bracketed {
            self.init_update(input)?;
        }
        let result = self
            .init_x(a.view(), input, rng)
            .and_then(|x| Ok(par_matmul(a.view(), x.view())?));
        if bracketed {
            self.complete_update();
        }
        *a = result?;
        Ok(())
    }
}
