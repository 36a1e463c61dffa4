//! Integration tests for the CLI binary.
//!
//! Runs the `nsc` binary against a private home directory.
//!
//! This test is registered as a [[test]] in the nsc-cli crate
//! so that CARGO_BIN_EXE_nsc is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `nsc` binary, isolated in `home`.
fn nsc_binary(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nsc"));
    cmd.env("HOME", home)
        .env("NSC_HOME", home.join("stores"))
        .env("NKEYS_PATH", home.join("nkeys"))
        .env_remove("NSC_OPERATOR");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    nsc_binary(home)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute nsc {args:?}: {e}"))
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let output = run(home, args);
    assert!(
        output.status.success(),
        "nsc {args:?} should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let home = tempfile::tempdir().unwrap();
    let stdout = run_ok(home.path(), &["--help"]);
    assert!(
        stdout.contains("nsc") || stdout.contains("Usage"),
        "nsc --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let home = tempfile::tempdir().unwrap();
    let stdout = run_ok(home.path(), &["--version"]);
    assert!(
        stdout.contains("nsc"),
        "nsc --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--nonexistent-flag"]);
    assert!(
        !output.status.success(),
        "nsc with unknown flag should exit with error"
    );
}

#[test]
fn cli_reports_missing_store() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["describe", "operator"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no stores available"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn cli_end_to_end_activation() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    let stdout = run_ok(home, &["init", "--name", "O"]);
    assert!(stdout.contains("Initialized store 'O'"), "got: {stdout}");

    run_ok(home, &["add", "account", "--name", "B"]);
    run_ok(home, &["env", "--account", "O"]);
    run_ok(
        home,
        &["add", "export", "--subject", "foo.>", "--private", "--service"],
    );
    run_ok(home, &["edit", "account", "--conns", "5", "--tag", "a,b"]);

    let described = run_ok(home, &["describe", "account", "--name", "O"]);
    assert!(described.contains("conns=5"), "got: {described}");
    assert!(described.contains("foo.>"), "got: {described}");
    assert!(described.contains("Chain:        valid"), "got: {described}");

    let json = run_ok(home, &["describe", "account", "--name", "B", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&json).expect("describe --json is JSON");
    let target = value["sub"].as_str().expect("claim has a subject").to_string();

    // Missing target account.
    let output = run(home, &["generate", "activation", "--subject", "foo.bar"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("target-account cannot be empty"),
        "unexpected stderr: {stderr}"
    );

    let token = run_ok(
        home,
        &[
            "generate",
            "activation",
            "--subject",
            "foo.bar",
            "--target-account",
            &target,
        ],
    );
    assert!(token.contains("-----BEGIN NATS ACTIVATION JWT-----"), "got: {token}");

    let token_file = home.join("act.jwt");
    std::fs::write(&token_file, &token).unwrap();
    run_ok(
        home,
        &[
            "add",
            "import",
            "--account",
            "B",
            "--token",
            token_file.to_str().unwrap(),
        ],
    );
    let described = run_ok(home, &["describe", "account", "--name", "B"]);
    assert!(described.contains("foo.bar"), "got: {described}");
}

#[test]
fn cli_users_and_creds() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    run_ok(home, &["init", "--name", "O"]);
    run_ok(home, &["add", "user", "--name", "alice", "--expiry", "2099-01-01"]);
    run_ok(
        home,
        &["edit", "user", "--name", "alice", "--allow-pub", "a.b,c.>"],
    );

    let users = run_ok(home, &["list", "users"]);
    assert!(users.contains("alice") && users.contains('O'), "got: {users}");

    let creds = run_ok(home, &["generate", "creds", "--name", "alice"]);
    assert!(creds.contains("-----BEGIN NATS USER JWT-----"));
    assert!(creds.contains("-----BEGIN USER NKEY SEED-----"));

    let keys = run_ok(home, &["list", "keys"]);
    assert!(keys.contains("operator") && keys.contains("user"), "got: {keys}");

    // Invalid edits are reported together and nothing is written.
    let output = run(
        home,
        &["edit", "account", "--conns", "x", "--subscriptions", "-5"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("conns") && stderr.contains("subs"),
        "unexpected stderr: {stderr}"
    );
}
