use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;

fn soulscout() -> Command {
    let mut cmd = Command::cargo_bin("soulscout").expect("binary built");
    cmd.env_remove("RUST_LOG")
        .env_remove("SOULSCOUT_MAX_DEPTH")
        .env_remove("SOULSCOUT_KNOWLEDGE_PATH");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json on stdout")
}

fn entry<'a>(report: &'a Value, locator: &str) -> &'a Value {
    report["interactions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["element"]["locator"] == locator)
        .unwrap_or_else(|| panic!("no entry for {locator}"))
}

#[test]
fn explore_walks_the_signup_fixture_offline() {
    let report = json_stdout(soulscout().args([
        "-o",
        "json",
        "explore",
        "--fixture",
        "fixtures/signup.yaml",
        "--oracle",
        "scripted",
    ]));

    assert_eq!(report["stack_balanced"], true);
    assert!(report["aborted"].is_null());
    assert_eq!(report["deepest"], 2);

    let email = entry(&report, "[name=\"email\"]");
    assert_eq!(email["context"], "overlay:signup-modal");
    assert_eq!(email["outcome"]["success"], true);

    let password = entry(&report, "[name=\"password\"]");
    assert_eq!(password["context"], "overlay:signup-modal-step-2");

    // login-modal is skip-listed in config/soulscout.yaml
    let login = entry(&report, "button:has-text(\"Log in\")");
    assert!(login["outcome"].is_null());
}

#[test]
fn triage_suggests_a_wait_for_timeouts() {
    let report = json_stdout(soulscout().args([
        "--output",
        "json",
        "triage",
        "--test-name",
        "checkout completes",
        "--error",
        "Timeout 30000ms exceeded waiting for selector",
    ]));

    assert_eq!(report["result"]["category"], "timing");
    assert_eq!(report["result"]["confidence"], 0.8);
    assert_eq!(report["should_escalate"], false);
    assert_eq!(report["attempted_strategies"][0], "timing_healing");
}

#[test]
fn heal_reports_the_winning_tier() {
    let assert = soulscout()
        .args([
            "heal",
            "--fixture",
            "fixtures/signup.yaml",
            "--locator",
            "#email",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    assert!(stdout.contains("Healed via transformation tier: [name=\"email\"]"));
}

#[test]
fn unknown_knowledge_kind_is_rejected() {
    soulscout()
        .args(["patterns", "--kind", "nonsense"])
        .assert()
        .failure();
}
