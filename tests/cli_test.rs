//! Command line tool tests
//!
//! Run the built binary and inspect what it prints.

use std::fs;
use std::process::{Command, Output};

fn tlsfront(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tlsfront"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run tlsfront")
}

#[test]
fn test_resolve_warnings_reach_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("ocsp");
    let conf = dir.path().join("tlsfront.conf");
    fs::write(
        &conf,
        format!("no-such-option = 1\nocsp-dir = \"{}\"\n", missing.display()),
    )
    .unwrap();

    let output = tlsfront(&["--client", "--config", conf.to_str().unwrap(), "-t"]);
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Ignoring unknown configuration key 'no-such-option'"),
        "stderr: {}",
        stderr
    );
    assert!(stderr.contains("Disabling OCSP stapling"), "stderr: {}", stderr);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["ocsp"]["dir"].is_null());
}

#[test]
fn test_resolve_failure_exits_non_zero() {
    let output = tlsfront(&["--client", "--workers=many"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid parameter 'workers'"), "stderr: {}", stderr);
}

#[test]
fn test_version() {
    let output = tlsfront(&["-V"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("tlsfront "));
}
