//! Integration tests driving the built binary offline.
//!
//! No console is reachable from the test environment, so these exercise the
//! paths that must fail fast and deterministically before any job starts:
//! argument validation, credential checks, and the login probe.

use std::process::{Command, Output};

fn aipctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aipctl"))
        .args(args)
        // Keep the environment from supplying credentials under test.
        .env_remove("AIPCTL_SERVER_URL")
        .env_remove("AIPCTL_API_KEY")
        .env_remove("AIPCTL_USERNAME")
        .output()
        .expect("run aipctl")
}

#[test]
fn help_lists_every_subcommand() {
    let output = aipctl(&["--help"]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    for command in [
        "analyze",
        "deliver",
        "snapshot",
        "onboard",
        "deep-analyze",
        "publish-imaging",
        "import",
        "update-settings",
    ] {
        assert!(text.contains(command), "missing {command} in help:\n{text}");
    }
}

#[test]
fn missing_api_key_exits_with_credentials_code() {
    let output = aipctl(&[
        "analyze",
        "--server-url",
        "http://127.0.0.1:9",
        "--app-name",
        "shop",
    ]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn unreachable_console_exits_with_login_code() {
    // Port 9 (discard) is closed; the login probe fails at transport level.
    let output = aipctl(&[
        "analyze",
        "--server-url",
        "http://127.0.0.1:9",
        "--api-key",
        "secret",
        "--app-name",
        "shop",
        "--timeout",
        "2",
    ]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn invalid_settings_fail_before_any_connection() {
    // Parse errors must not require a reachable console or credentials.
    let output = aipctl(&[
        "update-settings",
        "--server-url",
        "http://127.0.0.1:9",
        "--app-name",
        "shop",
        "--new-settings",
        "NOT_A_SETTING=1",
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let output = aipctl(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}
