//! Progressive discovery of a named resource.
//!
//! Users name things loosely: a CRD plural, a fully qualified
//! `eventhubs.azure.upbound.io`, an app name that is really a label value. A
//! single failed `kubectl get` must never end the search, so `generate` emits
//! an ordered fallback chain and `should_try_next` judges each attempt's
//! output. The chain is linear: strategies are consumed in the order generated
//! and running out of strategies is a normal "not found" outcome.

use serde::{Deserialize, Serialize};

/// One way of looking for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryStrategy {
    pub name: String,
    pub description: String,
    /// Alternative phrasings of the same approach (1..=3)
    pub commands: Vec<String>,
    /// Advisory ranking metadata in [0, 1]
    pub confidence: f32,
}

impl DiscoveryStrategy {
    fn new(name: &str, description: String, commands: Vec<String>, confidence: f32) -> Self {
        Self {
            name: name.to_string(),
            description,
            commands,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Output fragments that mean "this attempt found nothing"
const NEGATIVE_SIGNALS: &[&str] = &[
    "not found",
    "notfound",
    "no resources found",
    "error:",
    "doesn't have a resource type",
    "unknown resource type",
    "the server could not find the requested resource",
    "no matches for kind",
    "forbidden",
    "connection refused",
    "unable to connect to the server",
    "i/o timeout",
    "no such host",
];

/// Query words that justify searching configmaps and secrets
const CONFIG_KEYWORDS: &[&str] = &[
    "config",
    "secret",
    "certificate",
    "cert",
    "credential",
    "password",
    "token",
    "tls",
];

/// Minimum non-whitespace characters for output to count as an answer
const MIN_MEANINGFUL_CHARS: usize = 5;

/// Lowercase and strip anything that is not part of a Kubernetes name.
/// Leading `-`, `.` and `_` are dropped so the result never reads as a flag.
pub(crate) fn sanitize_name(resource_name: &str) -> String {
    let kept: String = resource_name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    kept.trim_start_matches(['-', '.', '_']).to_string()
}

/// Short form of a compound (three or more dot-separated segments) name
pub fn short_form(name: &str) -> &str {
    let segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 3 {
        segments[0]
    } else {
        name
    }
}

pub fn is_compound_name(name: &str) -> bool {
    name.split('.').filter(|s| !s.is_empty()).count() >= 3
}

/// Generates fallback strategies and judges attempt output
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryEngine;

impl DiscoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Ordered strategies for `resource_name`. Empty when the name has no
    /// usable characters.
    pub fn generate(&self, resource_name: &str, query_context: &str) -> Vec<DiscoveryStrategy> {
        let full = sanitize_name(resource_name);
        if full.trim_matches(|c| c == '.' || c == '-' || c == '_').is_empty() {
            return Vec::new();
        }
        let short = short_form(&full).to_string();
        let compound = is_compound_name(&full);
        let context = query_context.to_lowercase();

        let mut strategies = Vec::with_capacity(11);

        strategies.push(DiscoveryStrategy::new(
            "direct_lookup",
            format!("Look up `{short}` directly as a resource type"),
            vec![
                format!("kubectl get {short} -A"),
                format!("kubectl get {short} -A -o wide"),
            ],
            0.95,
        ));

        let crd_commands = if compound {
            vec![
                format!("kubectl get crd {full}"),
                format!("kubectl api-resources | grep -i '^{short} '"),
            ]
        } else {
            vec![
                format!("kubectl api-resources | grep -i '^{short} '"),
                format!("kubectl get crd | grep -i '^{short}\\.'"),
            ]
        };
        strategies.push(DiscoveryStrategy::new(
            "crd_exact",
            format!("Check that `{short}` is an installed API resource or CRD"),
            crd_commands,
            0.9,
        ));

        strategies.push(DiscoveryStrategy::new(
            "api_resource_partial",
            format!("Find API resources whose name contains `{short}`"),
            vec![
                format!("kubectl api-resources | grep -i {short}"),
                format!("kubectl get crd | grep -i {short}"),
            ],
            0.85,
        ));

        strategies.push(DiscoveryStrategy::new(
            "label_search",
            format!("Search common label keys for `{short}`"),
            vec![
                format!("kubectl get pods,deployments,services -A -l app={short}"),
                format!("kubectl get pods,deployments,services -A -l app.kubernetes.io/name={short}"),
                format!("kubectl get pods,deployments,services -A -l app.kubernetes.io/instance={short}"),
            ],
            0.8,
        ));

        strategies.push(DiscoveryStrategy::new(
            "namespace_heuristic",
            format!("Look for a namespace named after `{short}`"),
            vec![
                format!("kubectl get namespaces | grep -i {short}"),
                format!("kubectl get pods -n {short}"),
            ],
            0.75,
        ));

        strategies.push(DiscoveryStrategy::new(
            "workload_grep",
            format!("Grep workload names for `{short}`"),
            vec![format!(
                "kubectl get pods,deployments,statefulsets,daemonsets -A | grep -i {short}"
            )],
            0.7,
        ));

        strategies.push(DiscoveryStrategy::new(
            "image_search",
            format!("Find pods running an image that contains `{short}`"),
            vec![format!(
                "kubectl get pods -A -o jsonpath='{{range .items[*]}}{{.metadata.namespace}}/{{.metadata.name}} {{.spec.containers[*].image}}{{\"\\n\"}}{{end}}' | grep -i {short}"
            )],
            0.6,
        ));

        strategies.push(DiscoveryStrategy::new(
            "release_search",
            format!("Find helm releases named like `{short}`"),
            vec![
                format!("helm list -A | grep -i {short}"),
                format!("helm list -A --all | grep -i {short}"),
            ],
            0.55,
        ));

        strategies.push(DiscoveryStrategy::new(
            "network_search",
            format!("Find services, ingresses and endpoints named like `{short}`"),
            vec![format!(
                "kubectl get services,ingresses,endpoints -A | grep -i {short}"
            )],
            0.5,
        ));

        if CONFIG_KEYWORDS.iter().any(|k| context.contains(k)) {
            strategies.push(DiscoveryStrategy::new(
                "config_search",
                format!("Find configmaps and secrets named like `{short}`"),
                vec![format!("kubectl get configmaps,secrets -A | grep -i {short}")],
                0.4,
            ));
        }

        strategies.push(DiscoveryStrategy::new(
            "annotation_search",
            format!("Last resort: find objects whose annotations mention `{short}`"),
            vec![format!(
                "kubectl get pods,deployments,services -A -o jsonpath='{{range .items[*]}}{{.kind}}/{{.metadata.name}} {{.metadata.annotations}}{{\"\\n\"}}{{end}}' | grep -i {short}"
            )],
            0.3,
        ));

        strategies
    }

    /// Whether the caller should move on to the next strategy after `output`.
    ///
    /// Ambiguous non-empty output without error markers is accepted; see
    /// `is_confirmed_hit` to tell it apart from a listing.
    pub fn should_try_next(&self, output: &str, _strategy: &DiscoveryStrategy) -> bool {
        let meaningful = output.chars().filter(|c| !c.is_whitespace()).count();
        if meaningful < MIN_MEANINGFUL_CHARS {
            return true;
        }

        let lower = output.to_lowercase();
        NEGATIVE_SIGNALS.iter().any(|s| lower.contains(s))
    }

    /// Accepted output that also carries a table header or a `kind/name` token
    pub fn is_confirmed_hit(&self, output: &str, strategy: &DiscoveryStrategy) -> bool {
        !self.should_try_next(output, strategy) && (has_header_row(output) || has_kind_name_token(output))
    }
}

/// First non-empty line looks like a kubectl table header (`NAME  READY  STATUS`)
fn has_header_row(output: &str) -> bool {
    let Some(first) = output.lines().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    let cols: Vec<&str> = first.split_whitespace().collect();
    let is_header_word = |c: &&str| {
        c.chars()
            .all(|ch| ch.is_ascii_uppercase() || ch == '-' || ch == '_' || ch == '(' || ch == ')')
    };
    cols.iter().all(is_header_word) && cols.iter().any(|c| *c == "NAME" || *c == "NAMESPACE")
}

/// Some whitespace-separated token looks like `kind/name`
fn has_kind_name_token(output: &str) -> bool {
    output.split_whitespace().any(|token| {
        let mut parts = token.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(kind), Some(name)) => {
                !kind.is_empty()
                    && !name.is_empty()
                    && !name.contains('/')
                    && kind
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
            }
            _ => false,
        }
    })
}

/// One attempt recorded by a walk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryAttempt {
    pub strategy: String,
    pub command: String,
    pub advanced: bool,
}

/// Terminal state of a walk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DiscoveryOutcome {
    Found {
        strategy: String,
        command: String,
        output: String,
        /// False when the output was accepted only for lacking error markers
        confirmed: bool,
    },
    /// Not found by any strategy
    Exhausted { attempts: Vec<DiscoveryAttempt> },
}

/// Cursor over a generated strategy chain.
///
/// Within a strategy the alternative commands are tried in order; when every
/// alternative fails the walk moves to the next strategy. The caller runs each
/// command and feeds the output back through `record`.
#[derive(Debug, Clone)]
pub struct DiscoveryWalk {
    engine: DiscoveryEngine,
    strategies: Vec<DiscoveryStrategy>,
    strategy_idx: usize,
    command_idx: usize,
    attempts: Vec<DiscoveryAttempt>,
    found: Option<DiscoveryOutcome>,
}

impl DiscoveryWalk {
    pub fn new(strategies: Vec<DiscoveryStrategy>) -> Self {
        Self {
            engine: DiscoveryEngine,
            strategies,
            strategy_idx: 0,
            command_idx: 0,
            attempts: Vec::new(),
            found: None,
        }
    }

    pub fn for_resource(resource_name: &str, query_context: &str) -> Self {
        Self::new(DiscoveryEngine.generate(resource_name, query_context))
    }

    /// Strategy the next command belongs to
    pub fn current_strategy(&self) -> Option<&DiscoveryStrategy> {
        if self.found.is_some() {
            return None;
        }
        self.strategies.get(self.strategy_idx)
    }

    /// Next command to run, or None when the walk is finished
    pub fn next_command(&self) -> Option<&str> {
        self.current_strategy()
            .and_then(|s| s.commands.get(self.command_idx))
            .map(String::as_str)
    }

    /// Record the output of the command returned by `next_command`.
    /// Returns true when the output was accepted.
    pub fn record(&mut self, output: &str) -> bool {
        let Some(strategy) = self.current_strategy().cloned() else {
            return false;
        };
        let Some(command) = strategy.commands.get(self.command_idx).cloned() else {
            return false;
        };

        let advance = self.engine.should_try_next(output, &strategy);
        self.attempts.push(DiscoveryAttempt {
            strategy: strategy.name.clone(),
            command: command.clone(),
            advanced: advance,
        });

        if !advance {
            let confirmed = self.engine.is_confirmed_hit(output, &strategy);
            self.found = Some(DiscoveryOutcome::Found {
                strategy: strategy.name,
                command,
                output: output.to_string(),
                confirmed,
            });
            return true;
        }

        self.command_idx += 1;
        if self.command_idx >= strategy.commands.len() {
            self.strategy_idx += 1;
            self.command_idx = 0;
        }
        false
    }

    pub fn is_finished(&self) -> bool {
        self.next_command().is_none()
    }

    pub fn attempts(&self) -> &[DiscoveryAttempt] {
        &self.attempts
    }

    /// Final outcome; None while commands remain
    pub fn outcome(&self) -> Option<DiscoveryOutcome> {
        if let Some(found) = &self.found {
            return Some(found.clone());
        }
        if self.is_finished() {
            return Some(DiscoveryOutcome::Exhausted {
                attempts: self.attempts.clone(),
            });
        }
        None
    }
}
