use std::path::PathBuf;

use serde::Deserialize;

/// Top-level ERT project configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErtConfig {
    /// Global RNG seed.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Analysis module settings.
    #[serde(default)]
    pub analysis: AnalysisToml,

    /// Job queue settings.
    #[serde(default)]
    pub queue: QueueToml,

    /// Forward-model jobs, one per realization.
    #[serde(default)]
    pub jobs: Vec<JobToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisToml {
    #[serde(default = "default_module")]
    pub module: String,
    /// Energy fraction; ignored when `ncomp` is set.
    #[serde(default)]
    pub truncation: Option<f64>,
    #[serde(default)]
    pub ncomp: Option<usize>,
    #[serde(default)]
    pub nfolds: Option<usize>,
    #[serde(default)]
    pub pen_press: Option<bool>,
    #[serde(default)]
    pub do_cv: Option<bool>,
}

impl Default for AnalysisToml {
    fn default() -> Self {
        Self {
            module: default_module(),
            truncation: None,
            ncomp: None,
            nfolds: None,
            pen_press: None,
            do_cv: None,
        }
    }
}

fn default_module() -> String {
    "STD_ENKF".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueToml {
    /// Concurrent jobs; 0 = unlimited.
    #[serde(default)]
    pub max_running: usize,
    #[serde(default = "default_max_submit")]
    pub max_submit: usize,
    #[serde(default = "default_ok_file")]
    pub ok_file: String,
    #[serde(default = "default_exit_file")]
    pub exit_file: String,
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    #[serde(default)]
    pub max_duration_secs: Option<u64>,
    /// Successful jobs after which stragglers may be stopped; 0 disables.
    #[serde(default)]
    pub min_realizations: usize,
    #[serde(default)]
    pub auto_stop: bool,
}

impl Default for QueueToml {
    fn default() -> Self {
        Self {
            max_running: 0,
            max_submit: default_max_submit(),
            ok_file: default_ok_file(),
            exit_file: default_exit_file(),
            poll_ms: default_poll_ms(),
            max_duration_secs: None,
            min_realizations: 0,
            auto_stop: false,
        }
    }
}

fn default_max_submit() -> usize {
    2
}
fn default_ok_file() -> String {
    "OK.status".to_string()
}
fn default_exit_file() -> String {
    "ERROR".to_string()
}
fn default_poll_ms() -> u64 {
    250
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobToml {
    pub name: String,
    pub executable: PathBuf,
    pub run_path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}
