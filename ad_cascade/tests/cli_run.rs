mod common;

use std::{
    path::Path,
    process::{Command, Output},
};

use common::{HEADER, csv, row};

/// Runs `ad-cascade run` in `dir` with no platform credentials in the environment.
fn run_without_credentials(dir: &Path, input: &str) -> Output {
    std::fs::write(dir.join("input.csv"), input).unwrap();
    Command::new(env!("CARGO_BIN_EXE_ad-cascade"))
        .current_dir(dir)
        .args(["run", "--input", "input.csv", "--output", "ledger.csv"])
        .env_remove("FB_ACCESS_TOKEN")
        .env_remove("FB_AD_ACCOUNT_ID")
        .env_remove("FB_PAGE_ID")
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

#[test]
fn header_only_input_exits_cleanly_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_without_credentials(dir.path(), &format!("{HEADER}\n"));

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(!dir.path().join("ledger.csv").exists());
}

#[test]
fn sentinel_only_input_exits_cleanly_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let blank = ",".repeat(HEADER.matches(',').count());
    let out = run_without_credentials(dir.path(), &format!("{HEADER}\n{blank}\n"));

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(!dir.path().join("ledger.csv").exists());
}

#[test]
fn real_batch_still_requires_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let input = csv(&[row("Spring", "Set A", "Ad 1", "image", "01-03-2025", "05-03-2025")]);
    let out = run_without_credentials(dir.path(), &input);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("FB_ACCESS_TOKEN"));
}
