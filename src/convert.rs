//! Pure conversion functions: TOML and JSON structs -> crate API types.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use ndarray::Array2;
use tracing::warn;

use ert_analysis::params::{BOOTSTRAP_DO_CV, CV_NFOLDS, CV_PEN_PRESS, ENKF_NCOMP, ENKF_TRUNCATION};
use ert_analysis::{AnalysisModule, ModuleKind, Truncation};
use ert_queue::{LocalDriver, QueueConfig};

use crate::config::{AnalysisToml, QueueToml};

/// Builds an [`AnalysisModule`] from the TOML analysis configuration.
///
/// Parameters the selected module does not know are logged and ignored.
pub fn build_analysis_module(analysis: &AnalysisToml) -> Result<AnalysisModule> {
    let kind: ModuleKind = analysis
        .module
        .parse()
        .with_context(|| format!("invalid [analysis] module {:?}", analysis.module))?;
    let mut module = AnalysisModule::new(kind);

    if let Some(fraction) = analysis.truncation {
        Truncation::Energy(fraction)
            .validate()
            .context("invalid [analysis] truncation")?;
        apply(&mut module, ENKF_TRUNCATION, |m| m.set_double(ENKF_TRUNCATION, fraction));
    }
    if let Some(ncomp) = analysis.ncomp {
        if ncomp == 0 {
            bail!("[analysis] ncomp must be >= 1");
        }
        apply(&mut module, ENKF_NCOMP, |m| m.set_int(ENKF_NCOMP, to_i64(ncomp)));
    }
    if let Some(nfolds) = analysis.nfolds {
        if nfolds < 2 {
            bail!("[analysis] nfolds must be >= 2, got {nfolds}");
        }
        apply(&mut module, CV_NFOLDS, |m| m.set_int(CV_NFOLDS, to_i64(nfolds)));
    }
    if let Some(pen_press) = analysis.pen_press {
        apply(&mut module, CV_PEN_PRESS, |m| m.set_bool(CV_PEN_PRESS, pen_press));
    }
    if let Some(do_cv) = analysis.do_cv {
        apply(&mut module, BOOTSTRAP_DO_CV, |m| m.set_bool(BOOTSTRAP_DO_CV, do_cv));
    }
    Ok(module)
}

fn apply(module: &mut AnalysisModule, name: &str, set: impl FnOnce(&mut AnalysisModule) -> bool) {
    if !set(module) {
        warn!(module = module.name(), parameter = name, "parameter not used by module");
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Builds a [`QueueConfig`] from the TOML queue configuration.
pub fn build_queue_config(queue: &QueueToml) -> Result<QueueConfig> {
    let cfg = QueueConfig::new()
        .with_max_submit(queue.max_submit)
        .with_ok_file(&queue.ok_file)
        .with_exit_file(&queue.exit_file)
        .with_poll_interval(Duration::from_millis(queue.poll_ms));
    cfg.validate().context("invalid [queue] section")?;
    Ok(cfg)
}

/// Builds the local process driver from the TOML queue configuration.
pub fn build_driver(queue: &QueueToml) -> LocalDriver {
    LocalDriver::new().with_max_running(queue.max_running)
}

/// The configured per-job duration limit, if any.
pub fn max_duration(queue: &QueueToml) -> Option<Duration> {
    queue.max_duration_secs.map(Duration::from_secs)
}

/// Converts row-major nested vectors into a matrix.
///
/// An empty outer vector gives a `0 × empty_cols` matrix.
pub fn to_array2(rows: &[Vec<f64>], what: &str, empty_cols: usize) -> Result<Array2<f64>> {
    let Some(first) = rows.first() else {
        return Ok(Array2::zeros((0, empty_cols)));
    };
    let ncols = first.len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        bail!(
            "matrix {what}: row {i} has {} columns, expected {ncols}",
            row.len()
        );
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), flat)
        .with_context(|| format!("matrix {what} has an invalid shape"))
}

/// Converts a matrix into row-major nested vectors.
pub fn from_array2(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|row| row.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn analysis(module: &str) -> AnalysisToml {
        AnalysisToml {
            module: module.to_string(),
            ..AnalysisToml::default()
        }
    }

    #[test]
    fn module_parameters_applied() {
        let mut toml = analysis("cv_enkf");
        toml.nfolds = Some(4);
        toml.pen_press = Some(true);
        toml.truncation = Some(0.9);
        let module = build_analysis_module(&toml).unwrap();
        assert_eq!(module.kind(), ModuleKind::Cv);
        assert_eq!(module.get_int(CV_NFOLDS), Some(4));
        assert_eq!(module.get_bool(CV_PEN_PRESS), Some(true));
        assert_eq!(module.get_double(ENKF_TRUNCATION), Some(0.9));
    }

    #[test]
    fn ncomp_replaces_truncation() {
        let mut toml = analysis("STD_ENKF");
        toml.truncation = Some(0.9);
        toml.ncomp = Some(3);
        let module = build_analysis_module(&toml).unwrap();
        assert_eq!(module.get_int(ENKF_NCOMP), Some(3));
        assert_eq!(module.get_double(ENKF_TRUNCATION), None);
    }

    #[test]
    fn bad_analysis_values_rejected() {
        assert!(build_analysis_module(&analysis("SQRT_ENKF")).is_err());
        let mut toml = analysis("STD_ENKF");
        toml.truncation = Some(1.5);
        assert!(build_analysis_module(&toml).is_err());
        let mut toml = analysis("CV_ENKF");
        toml.nfolds = Some(1);
        assert!(build_analysis_module(&toml).is_err());
    }

    #[test]
    fn queue_config_from_toml() {
        let toml = QueueToml {
            max_submit: 4,
            poll_ms: 20,
            ..QueueToml::default()
        };
        let cfg = build_queue_config(&toml).unwrap();
        assert_eq!(cfg.max_submit(), 4);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(20));
        assert!(max_duration(&toml).is_none());

        let zero_poll = QueueToml {
            poll_ms: 0,
            ..QueueToml::default()
        };
        assert!(build_queue_config(&zero_poll).is_err());
    }

    #[test]
    fn matrix_conversion() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let m = to_array2(&rows, "A", 0).unwrap();
        assert_eq!(m, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(from_array2(&m), rows);

        assert_eq!(to_array2(&[], "dObs", 2).unwrap().dim(), (0, 2));
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        let err = to_array2(&ragged, "S", 0).unwrap_err();
        assert_eq!(err.to_string(), "matrix S: row 1 has 1 columns, expected 2");
    }
}
