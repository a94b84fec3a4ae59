//! Binary-level tests for the worker

use std::process::{Command, Stdio};

#[test]
fn test_json_logs_stay_off_stdout() {
    let output = Command::new(env!("CARGO_BIN_EXE_agnes-worker"))
        .arg("handle")
        .current_dir(std::env::temp_dir())
        .env("LOG_FORMAT", "json")
        .env_remove("RUST_LOG")
        .env_remove("DATABASE_URL")
        .env_remove("AGNES__DATABASE__URL")
        .stdin(Stdio::null())
        .output()
        .expect("worker binary should start");

    // Without DATABASE_URL the worker logs its banner and exits.
    assert!(!output.status.success());
    assert!(
        output.stdout.is_empty(),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr
        .lines()
        .any(|line| line.starts_with('{') && line.contains("Agnes Worker")));
}
