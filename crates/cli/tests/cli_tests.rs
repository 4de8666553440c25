// Integration tests for the `postwatch` binary: exit codes, artifacts on disk,
// and the --json / inspect stdout contracts.
//
// Run with: cargo test -p postwatch-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook_auto, Reader};
use sha2::{Digest, Sha256};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../recon/tests/fixtures")
        .join(name)
}

/// The binary with an isolated config dir so a real user config never leaks in.
fn postwatch(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_postwatch"));
    cmd.env_remove("POSTWATCH_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home);
    cmd
}

fn run(config_home: &Path, args: &[&str]) -> Output {
    postwatch(config_home).args(args).output().expect("run postwatch")
}

fn fixture_args(posts: &str, election: &str) -> Vec<String> {
    vec![
        "--posts".into(),
        fixture(posts).display().to_string(),
        "--election".into(),
        fixture(election).display().to_string(),
    ]
}

fn run_owned(config_home: &Path, args: Vec<String>) -> Output {
    postwatch(config_home).args(&args).output().expect("run postwatch")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{stdout}"))
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

// ===========================================================================
// export
// ===========================================================================

#[test]
fn export_writes_both_artifacts() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut args = vec!["export".to_string()];
    args.extend(fixture_args("posts-current.json", "election.json"));
    args.extend(["--out-dir".into(), out.path().display().to_string()]);
    let output = run_owned(home.path(), args);
    assert_exit(&output, 0);

    let xlsx = out.path().join("posts-per-party_all.xlsx");
    let pdf = out.path().join("posts-per-party_all.pdf");

    let workbook = open_workbook_auto(&xlsx).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["2025", "2021", "Both"]);

    let doc = lopdf::Document::load(&pdf).unwrap();
    assert!(!doc.get_pages().is_empty());

    // only the two artifacts, no temp files
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 2);
}

#[test]
fn export_single_format() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut args = vec!["export".to_string(), "--format".into(), "pdf".into()];
    args.extend(fixture_args("posts-legacy.json", "election.json"));
    args.extend(["--out-dir".into(), out.path().display().to_string()]);
    let output = run_owned(home.path(), args);
    assert_exit(&output, 0);

    assert!(out.path().join("posts-per-party_all.pdf").exists());
    assert!(!out.path().join("posts-per-party_all.xlsx").exists());
}

#[test]
fn export_json_summary_hashes_artifacts() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut args = vec!["export".to_string(), "--json".into()];
    args.extend(fixture_args("posts-legacy.json", "election.json"));
    args.extend(["--out-dir".into(), out.path().display().to_string()]);
    let output = run_owned(home.path(), args);
    assert_exit(&output, 0);

    let summary = stdout_json(&output);
    assert_eq!(summary["generation"], "legacy");
    assert_eq!(summary["periods"], serde_json::json!(["2021", "2025"]));
    assert_eq!(summary["entities"], 8);
    // the legacy fixture carries one wrong diffPost entry
    assert_eq!(summary["issues"], 1);

    let artifacts = summary["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 2);
    for artifact in artifacts {
        let path = PathBuf::from(artifact["path"].as_str().unwrap());
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(artifact["bytes"], bytes.len());
        let expected = format!("sha256:{:x}", Sha256::digest(&bytes));
        assert_eq!(artifact["hash"], expected.as_str());
    }
}

#[test]
fn export_empty_payloads_still_writes_artifacts() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let posts = out.path().join("posts.json");
    let election = out.path().join("election.json");
    std::fs::write(&posts, "{}").unwrap();
    std::fs::write(&election, "{}").unwrap();
    let target = out.path().join("artifacts");

    let output = run(
        home.path(),
        &[
            "export",
            "--posts",
            posts.to_str().unwrap(),
            "--election",
            election.to_str().unwrap(),
            "--out-dir",
            target.to_str().unwrap(),
        ],
    );
    assert_exit(&output, 0);

    let mut workbook = open_workbook_auto(target.join("posts-per-party_all.xlsx")).unwrap();
    let range = workbook.worksheet_range("Both").unwrap();
    assert_eq!(range.height(), 1);
    assert!(target.join("posts-per-party_all.pdf").exists());
}

#[test]
fn export_negative_count_is_recovered() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let posts = out.path().join("posts.json");
    let election = out.path().join("election.json");
    std::fs::write(&posts, r#"{"electionPosts2021": {"SPD": -3, "CDU": 5}}"#).unwrap();
    std::fs::write(&election, "{}").unwrap();

    let output = run(
        home.path(),
        &[
            "export",
            "--json",
            "--posts",
            posts.to_str().unwrap(),
            "--election",
            election.to_str().unwrap(),
            "--out-dir",
            out.path().to_str().unwrap(),
        ],
    );
    assert_exit(&output, 0);
    let summary = stdout_json(&output);
    assert_eq!(summary["issues"], 1);
    assert_eq!(summary["artifacts"].as_array().unwrap().len(), 2);

    let output = run(
        home.path(),
        &["inspect", "--posts", posts.to_str().unwrap(), "--election", election.to_str().unwrap()],
    );
    assert_exit(&output, 0);
    let report = stdout_json(&output);
    assert_eq!(report["issues"][0]["kind"], "negative_value");
    assert_eq!(report["issues"][0]["entity"], "SPD");
}

#[test]
fn config_renames_outputs_and_periods() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let config = out.path().join("report.toml");
    std::fs::write(
        &config,
        r##"
title = "Wahlbeobachtung"

[periods]
first = "2017"
second = "2021"

[output]
workbook = "report.xlsx"
document = "report.pdf"

[palette]
Piraten = "#FF8800"
"##,
    )
    .unwrap();
    let posts = out.path().join("posts.json");
    let election = out.path().join("election.json");
    std::fs::write(&posts, r#"{"electionPosts2017": {"Piraten": 3}, "electionPosts2021": {"Piraten": 5}}"#).unwrap();
    std::fs::write(&election, r#"{"election2017": {"Piraten": 0.4}, "election2021": {"Piraten": 0.1}}"#).unwrap();

    let output = run(
        home.path(),
        &[
            "export",
            "--posts",
            posts.to_str().unwrap(),
            "--election",
            election.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--out-dir",
            out.path().to_str().unwrap(),
        ],
    );
    assert_exit(&output, 0);

    let workbook = open_workbook_auto(out.path().join("report.xlsx")).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["2021", "2017", "Both"]);
    assert!(out.path().join("report.pdf").exists());
}

// ===========================================================================
// inspect
// ===========================================================================

#[test]
fn inspect_prints_report() {
    let home = tempfile::tempdir().unwrap();
    let mut args = vec!["inspect".to_string()];
    args.extend(fixture_args("posts-current.json", "election.json"));
    let output = run_owned(home.path(), args);
    assert_exit(&output, 0);

    let report = stdout_json(&output);
    assert_eq!(report["generation"], "current");
    assert_eq!(report["period_a"]["label"], "2021");
    assert_eq!(report["comparison"][0]["entity"], "AfD");
    assert_eq!(report["comparison"][0]["diff_posts"], 79.0);
    assert!(report.get("charts").is_none());
}

#[test]
fn inspect_with_charts() {
    let home = tempfile::tempdir().unwrap();
    let mut args = vec!["inspect".to_string(), "--charts".into()];
    args.extend(fixture_args("posts-current.json", "election.json"));
    let output = run_owned(home.path(), args);
    assert_exit(&output, 0);

    let report = stdout_json(&output);
    let charts = &report["charts"];
    assert_eq!(charts["periods"][0]["label"], "2025");
    assert_eq!(charts["periods"][0]["posts_pie"]["type"], "pie");
    assert_eq!(charts["comparison"]["delta_scatter"]["type"], "scatter");
}

// ===========================================================================
// exit codes
// ===========================================================================

#[test]
fn missing_payload_is_input_error() {
    let home = tempfile::tempdir().unwrap();
    let output = run(
        home.path(),
        &["inspect", "--posts", "/nonexistent/posts.json", "--election", "/nonexistent/e.json"],
    );
    assert_exit(&output, 3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: cannot read"));
}

#[test]
fn invalid_json_is_input_error() {
    let home = tempfile::tempdir().unwrap();
    let posts = home.path().join("posts.json");
    std::fs::write(&posts, "[1, 2,").unwrap();
    let election = fixture("election.json");
    let output = run(
        home.path(),
        &["inspect", "--posts", posts.to_str().unwrap(), "--election", election.to_str().unwrap()],
    );
    assert_exit(&output, 3);
}

#[test]
fn invalid_config_is_config_error() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "[periods]\nfirst = \"2025\"\nsecond = \"2025\"\n").unwrap();

    let mut args = vec!["inspect".to_string(), "--config".into(), config.display().to_string()];
    args.extend(fixture_args("posts-current.json", "election.json"));
    let output = run_owned(home.path(), args);
    assert_exit(&output, 4);
}

#[test]
fn out_dir_that_is_a_file_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    let mut args = vec!["export".to_string(), "--out-dir".into(), file.display().to_string()];
    args.extend(fixture_args("posts-current.json", "election.json"));
    let output = run_owned(home.path(), args);
    assert_exit(&output, 2);
}

#[test]
fn unknown_flag_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["export", "--nope"]);
    assert_exit(&output, 2);
}

#[test]
fn config_path_prints_location() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["config-path"]);
    assert_exit(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().ends_with("report.toml"), "{stdout}");
}
