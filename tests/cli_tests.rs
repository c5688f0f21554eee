#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Test that the CLI shows help
#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Slack client"));
}

/// Test that version flag works
#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("slack-hub"));
}

/// Test that unknown commands fail gracefully
#[test]
fn test_unknown_command() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.arg("unknown-command").assert().failure();
}

/// Test auth subcommand help
#[test]
fn test_auth_help() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.args(["auth", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Team and token management"));
}

/// Test conversations subcommand help
#[test]
fn test_conversations_help() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.args(["conversations", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Channels, private groups"));
}

/// Test cache subcommand help lists its actions
#[test]
fn test_cache_help() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.args(["cache", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh").and(predicate::str::contains("status")));
}

/// Test search requires a query
#[test]
fn test_search_requires_query() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.arg("search").assert().failure();
}

/// Test JSON output format flag
#[test]
fn test_json_format_flag() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.args(["-f", "json", "--help"]).assert().success();
}

/// Test invalid format flag
#[test]
fn test_invalid_format() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.args(["-f", "invalid", "conversations", "channels"])
        .assert()
        .failure();
}

/// Test completions generation
#[test]
fn test_completions_bash() {
    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("slack-hub"));
}

/// Test that a token Slack rejects makes `auth add` fail
#[cfg(target_os = "linux")]
#[tokio::test(flavor = "multi_thread")]
async fn test_auth_add_rejected_token_fails() {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth.test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "invalid_auth" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::TempDir::new().unwrap();
    let config_dir = home.path().join("config").join("slack-hub");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!("[api]\nbase_url = \"{}\"\n", server.uri()),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("slack-hub").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_CACHE_HOME", home.path().join("cache"))
        .env_remove("SLACK_TOKEN")
        .args(["auth", "add", "xoxp-bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_auth"));
}
