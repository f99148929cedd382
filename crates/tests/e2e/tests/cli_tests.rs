//! Exercises the `remotedoc-cli` binary as an operator would invoke it
//! (§6's CLI surface): schema/tool introspection and the mutually
//! exclusive `--enable-webhook` / `--sync-interval` flags, run as a real
//! subprocess rather than through `clap`'s in-process parser.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn tools_subcommand_lists_list_doc_and_read_doc() {
    let mut cmd = Command::cargo_bin("remotedoc-cli").unwrap();
    cmd.arg("tools");
    cmd.assert().success().stdout(predicate::str::contains("list_doc")).stdout(predicate::str::contains("read_doc"));
}

#[test]
fn schema_subcommand_prints_valid_json_to_stdout() {
    let mut cmd = Command::cargo_bin("remotedoc-cli").unwrap();
    cmd.arg("schema");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("schema subcommand must print valid json");
    assert!(parsed.is_array());
}

#[test]
fn schema_subcommand_writes_to_the_requested_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("tools.json");

    let mut cmd = Command::cargo_bin("remotedoc-cli").unwrap();
    cmd.arg("schema").arg("--output").arg(&out_path);
    cmd.assert().success();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(parsed.is_array());
}

#[test]
fn enable_webhook_and_sync_interval_together_is_rejected_at_the_process_level() {
    let mut cmd = Command::cargo_bin("remotedoc-cli").unwrap();
    cmd.arg("--enable-webhook").arg("--sync-interval").arg("60");
    cmd.assert().failure().stderr(predicate::str::contains("cannot be used with"));
}
