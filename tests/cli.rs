//! Runs the `ert` binary end to end.

use std::fs;
use std::path::Path;
use std::process::Command;

use approx::assert_abs_diff_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

fn ert() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ert"))
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("ert.toml");
    fs::write(&path, body).unwrap();
    path
}

fn matrix(value: &Value) -> Vec<Vec<f64>> {
    serde_json::from_value(value.clone()).unwrap()
}

#[test]
fn update_with_zero_innovation_keeps_ensemble() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "seed = 3\n[analysis]\nmodule = \"STD_ENKF\"\n");
    let a = json!([[1.0, 2.0, 3.0, 4.0], [0.5, -0.5, 1.5, 2.5]]);
    let case = json!({
        "a": a,
        "s": [[1.0, 2.0, 4.0, 3.0], [0.0, 1.0, 0.5, 2.0]],
        "r": [[1.0, 0.0], [0.0, 1.0]],
        "e": [[0.1, -0.1, 0.2, -0.2], [0.0, 0.1, -0.1, 0.0]],
        "d": [[0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]]
    });
    let case_path = dir.path().join("case.json");
    fs::write(&case_path, case.to_string()).unwrap();
    let out_path = dir.path().join("out.json");

    let status = ert()
        .arg("update")
        .arg("--config")
        .arg(&config)
        .arg("--case")
        .arg(&case_path)
        .arg("--output")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let out: Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    let updated = matrix(&out["a"]);
    let original = matrix(&a);
    assert_eq!(updated.len(), 2);
    for (row, orig) in updated.iter().zip(&original) {
        for (x, y) in row.iter().zip(orig) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
    }
}

#[test]
fn update_rejects_mismatched_case() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let case = json!({
        "a": [[1.0, 2.0, 3.0]],
        "s": [[1.0, 2.0, 4.0, 3.0]],
        "r": [[1.0]],
        "e": [[0.0, 0.0, 0.0, 0.0]],
        "d": [[0.0, 0.0, 0.0, 0.0]]
    });
    let case_path = dir.path().join("case.json");
    fs::write(&case_path, case.to_string()).unwrap();

    let output = ert()
        .args(["update", "--case"])
        .arg(&case_path)
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(dir.path().join("out.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ensemble does not match"), "{stderr}");
}

#[test]
fn unknown_config_key_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[queue]\nmax_runing = 2\n");
    let output = ert().arg("run").arg("--config").arg(&config).output().unwrap();
    assert!(!output.status.success());
}

#[cfg(unix)]
#[test]
fn run_executes_jobs() {
    let dir = TempDir::new().unwrap();
    let mut body = String::from("[queue]\nmax_running = 2\npoll_ms = 20\nmin_realizations = 3\n");
    for i in 0..3 {
        let run_path = dir.path().join(format!("real-{i}"));
        body.push_str(&format!(
            "\n[[jobs]]\nname = \"real-{i}\"\nexecutable = \"sh\"\nrun_path = {:?}\nargs = [\"-c\", \"touch OK.status\"]\n",
            run_path.display().to_string()
        ));
    }
    let config = write_config(dir.path(), &body);

    let status = ert().arg("run").arg("--config").arg(&config).status().unwrap();
    assert!(status.success());
    for i in 0..3 {
        assert!(dir.path().join(format!("real-{i}")).join("OK.status").exists());
    }
}

#[cfg(unix)]
#[test]
fn run_fails_below_quorum() {
    let dir = TempDir::new().unwrap();
    let run_path = dir.path().join("real-0");
    let body = format!(
        "[queue]\nmax_submit = 1\npoll_ms = 20\nmin_realizations = 1\n\n[[jobs]]\nname = \"real-0\"\nexecutable = \"sh\"\nrun_path = {:?}\nargs = [\"-c\", \"exit 1\"]\n",
        run_path.display().to_string()
    );
    let config = write_config(dir.path(), &body);

    let output = ert().arg("run").arg("--config").arg(&config).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("only 0 of 1"), "{stderr}");
}
