//! CLI parsing and command output tests.

use clap::Parser;
use serde_json::Value;
use sleuthctl::cli::{Cli, Commands, DialectArg};
use sleuthctl::commands::{self, phase, EXIT_APPROVAL, EXIT_BLOCKED};
use sleuthd::{ControlPlane, SleuthConfig};
use std::io::Write;

fn plane() -> ControlPlane {
    ControlPlane::new(SleuthConfig::default())
}

fn run(args: &[&str]) -> commands::Outcome {
    let cli = Cli::try_parse_from(args).unwrap();
    commands::run(&cli, &plane()).unwrap()
}

fn json(outcome: &commands::Outcome) -> Value {
    serde_json::from_str(&outcome.text).unwrap()
}

#[test]
fn test_parse_validate_with_dialect() {
    let cli = Cli::try_parse_from(["sleuthctl", "validate", "az group list", "--dialect", "cloud"]).unwrap();
    match cli.command {
        Commands::Validate { command, dialect } => {
            assert_eq!(command, "az group list");
            assert_eq!(dialect, Some(DialectArg::Cloud));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_signature_requires_text() {
    assert!(Cli::try_parse_from(["sleuthctl", "signature"]).is_err());
}

#[test]
fn test_validate_exit_codes() {
    let allowed = run(&["sleuthctl", "--json", "validate", "kubectl get pods -A"]);
    assert_eq!(allowed.exit_code, 0);
    assert_eq!(json(&allowed)["verdict"], "ALLOWED");

    let blocked = run(&["sleuthctl", "--json", "validate", "kubectl apply -f x.yaml"]);
    assert_eq!(blocked.exit_code, EXIT_BLOCKED);
}

#[test]
fn test_config_file_enables_approval() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[safety]\nremediation_requires_approval = true").unwrap();

    let config = SleuthConfig::load_or_default(Some(file.path())).unwrap();
    let plane = ControlPlane::new(config);
    let cli = Cli::try_parse_from(["sleuthctl", "validate", "kubectl delete pod web-1"]).unwrap();
    let outcome = commands::run(&cli, &plane).unwrap();
    assert_eq!(outcome.exit_code, EXIT_APPROVAL);
}

#[test]
fn test_discover_lists_strategies() {
    let outcome = run(&["sleuthctl", "--json", "discover", "orders-hub"]);
    let strategies = json(&outcome);
    let names: Vec<&str> = strategies
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names[0], "direct_lookup");
    assert!(!names.contains(&"config_search"));
}

#[test]
fn test_judge_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "Error from server (NotFound): eventhubs \"orders\" not found").unwrap();
    let path = file.path().to_str().unwrap();

    let outcome = run(&["sleuthctl", "--json", "judge", "--file", path]);
    assert_eq!(json(&outcome)["try_next"], true);
}

#[test]
fn test_signature_first_match() {
    let outcome = run(&["sleuthctl", "--json", "signature", "Error:", "ImagePullBackOff"]);
    let matches = json(&outcome);
    assert_eq!(matches[0]["id"], "image_pull_failure");
}

#[test]
fn test_signature_no_match() {
    let outcome = run(&["sleuthctl", "signature", "all good"]);
    assert_eq!(outcome.text, "No known error signature matched");
}

#[test]
fn test_parse_context_scalars() {
    let ctx = phase::parse_context(r#"{"crd_type": "eventhubs", "controller_logs_checked": true, "namespace": null}"#)
        .unwrap();
    assert_eq!(ctx.crd_type.as_deref(), Some("eventhubs"));
    assert!(ctx.controller_logs_checked);
    assert!(ctx.namespace.is_none());

    assert!(phase::parse_context("[]").is_err());
    assert!(phase::parse_context(r#"{"crd": "x"}"#).is_err());
}

#[test]
fn test_parse_history_skips_comments() {
    let history = phase::parse_history("# session\nkubectl get pods\n\n  kubectl logs p -n ns  \n");
    assert_eq!(history, vec!["kubectl get pods", "kubectl logs p -n ns"]);
}

#[test]
fn test_phase_rejects_early_answer() {
    let outcome = run(&[
        "sleuthctl",
        "--json",
        "phase",
        "--context",
        r#"{"crd_type": "eventhubs", "resource_name": "orders", "namespace": "prod"}"#,
        "--query",
        "why is my eventhub failing",
        "--action",
        "respond",
    ]);
    assert_eq!(outcome.exit_code, EXIT_BLOCKED);
    let report = json(&outcome);
    assert_eq!(report["phase"], "DISCOVER");
    assert_eq!(report["gated"], true);
    assert_eq!(report["enforcement"]["allowed"], false);
    assert_eq!(report["missing"].as_array().map(Vec::len), Some(0));
    assert_eq!(report["collect_next"][0], "status_state");
}

#[test]
fn test_phase_ungated_query_passes() {
    let outcome = run(&["sleuthctl", "--json", "phase", "--query", "list my namespaces", "--action", "respond"]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(json(&outcome)["gated"], false);
}

#[test]
fn test_config_prints_toml() {
    let outcome = run(&["sleuthctl", "config"]);
    let parsed: SleuthConfig = toml::from_str(&outcome.text).unwrap();
    assert_eq!(parsed, SleuthConfig::default());
}
