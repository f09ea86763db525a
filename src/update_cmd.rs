//! Update command: one analysis step on the matrices of a JSON case file.

use std::fs;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use ert_analysis::AnalysisInput;

use crate::cli::UpdateArgs;
use crate::convert;

/// Row-major matrices of one update step.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseFile {
    a: Vec<Vec<f64>>,
    s: Vec<Vec<f64>>,
    r: Vec<Vec<f64>>,
    #[serde(default)]
    d_obs: Vec<Vec<f64>>,
    e: Vec<Vec<f64>>,
    d: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct UpdatedEnsemble {
    a: Vec<Vec<f64>>,
}

/// Run the update pipeline.
pub fn run(args: UpdateArgs) -> Result<()> {
    let _cmd = info_span!("update").entered();

    let cfg = crate::load_config(&args.config)?;
    let mut module = convert::build_analysis_module(&cfg.analysis)?;

    let text = fs::read_to_string(&args.case)
        .with_context(|| format!("failed to read case file: {}", args.case.display()))?;
    let case: CaseFile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse case file: {}", args.case.display()))?;

    let mut a = convert::to_array2(&case.a, "A", 0)?;
    let s = convert::to_array2(&case.s, "S", 0)?;
    let r = convert::to_array2(&case.r, "R", 0)?;
    let d_obs = convert::to_array2(&case.d_obs, "dObs", 2)?;
    let e = convert::to_array2(&case.e, "E", 0)?;
    let d = convert::to_array2(&case.d, "D", 0)?;

    let input = AnalysisInput::new(s.view(), r.view(), d_obs.view(), e.view(), d.view());
    input.validate().context("inconsistent case matrices")?;
    input
        .validate_ensemble(a.view())
        .context("ensemble does not match the responses")?;
    info!(
        module = module.name(),
        nrobs = input.nrobs(),
        ens_size = input.ens_size(),
        state_size = a.nrows(),
        "case loaded"
    );

    let seed = args.seed.or(cfg.seed);
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    module
        .run_update(&mut a, &input, &mut rng)
        .with_context(|| format!("{} update failed", module.name()))?;

    let out = UpdatedEnsemble {
        a: convert::from_array2(&a),
    };
    let json = serde_json::to_string_pretty(&out).context("failed to serialize ensemble")?;
    fs::write(&args.output, json)
        .with_context(|| format!("failed to write output: {}", args.output.display()))?;
    info!(path = %args.output.display(), "updated ensemble written");

    Ok(())
}
