//! Golden tests for discovery strategy generation.

use sleuth_shared::discovery::{DiscoveryEngine, DiscoveryOutcome, DiscoveryWalk};
use sleuth_shared::safety::CommandSafetyValidator;

#[test]
fn test_compound_name_short_form_first() {
    let strategies = DiscoveryEngine::new().generate("eventhubs.azure.upbound.io", "find eventhubs");
    let first = &strategies[0].commands[0];
    assert!(first.contains("get eventhubs"));
    assert!(!first.contains("eventhubs.azure.upbound.io"));
}

#[test]
fn test_generated_commands_pass_validator() {
    let engine = DiscoveryEngine::new();
    let validator = CommandSafetyValidator::default();
    let inputs = [
        ("eventhubs.azure.upbound.io", "why is my eventhub not ready"),
        ("payments-api", "tls certificate secret expired"),
        ("Redis", ""),
    ];
    for (name, context) in inputs {
        for strategy in engine.generate(name, context) {
            for cmd in &strategy.commands {
                let result = validator.validate_command(cmd);
                assert!(result.is_allowed(), "{cmd}: {}", result.reason);
                assert!(!cmd.contains("get all -A"));
            }
        }
    }
}

#[test]
fn test_should_try_next_golden() {
    let engine = DiscoveryEngine::new();
    let strategies = engine.generate("web", "");
    let s = &strategies[0];
    assert!(engine.should_try_next("", s));
    assert!(!engine.should_try_next("NAME NAMESPACE\nfoo/bar", s));
}

#[test]
fn test_walk_reports_exhaustion() {
    let mut walk = DiscoveryWalk::for_resource("nothing-here", "");
    let mut steps = 0;
    while walk.next_command().is_some() {
        walk.record("Error from server (NotFound): nothing-here not found");
        steps += 1;
    }
    assert_eq!(steps, walk.attempts().len());
    assert!(matches!(walk.outcome(), Some(DiscoveryOutcome::Exhausted { .. })));
    assert!(!walk.record("NAME\nx"));
}
