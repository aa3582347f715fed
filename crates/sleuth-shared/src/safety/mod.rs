//! Command safety validator.
//!
//! Every command the investigation loop wants to run passes through here
//! before it reaches a shell. Three dialects are understood:
//! - cluster CLI (`kubectl`, `oc`, `helm`): verb and flag rule tables, first match wins
//! - cloud CLI (`az`): read-only allow-list, then mutation vocabulary, then default-deny
//! - tool calls (structured JSON actions): verb detection in action names and parameters
//!
//! Validation is a pure function over static tables and never fails: input
//! that cannot be understood is blocked as unparseable.

pub mod rules;
pub mod shell;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rules::{ClusterRule, RuleClass};
use shell::Stage;

/// Outcome of a validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allowed,
    Blocked,
    RequiresApproval,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "ALLOWED",
            Verdict::Blocked => "BLOCKED",
            Verdict::RequiresApproval => "REQUIRES_APPROVAL",
        }
    }

    fn severity(&self) -> u8 {
        match self {
            Verdict::Allowed => 0,
            Verdict::RequiresApproval => 1,
            Verdict::Blocked => 2,
        }
    }
}

/// Command dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    ClusterCli,
    CloudCli,
    ToolCall,
}

impl Dialect {
    /// Detect the dialect from the command prefix
    pub fn detect(command: &str) -> Option<Dialect> {
        let trimmed = command.trim_start();
        if trimmed.starts_with('{') {
            return Some(Dialect::ToolCall);
        }
        let first = trimmed.split_whitespace().next()?;
        let program = first.rsplit('/').next().unwrap_or(first).to_lowercase();
        match program.as_str() {
            "kubectl" | "oc" | "helm" => Some(Dialect::ClusterCli),
            "az" => Some(Dialect::CloudCli),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::ClusterCli => "cluster_cli",
            Dialect::CloudCli => "cloud_cli",
            Dialect::ToolCall => "tool_call",
        }
    }
}

/// Result of validating one command. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandValidation {
    pub verdict: Verdict,
    pub reason: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Label of the table entry that decided the verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl CommandValidation {
    fn allowed(command: &str, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Allowed,
            reason: reason.into(),
            command: command.to_string(),
            suggestion: None,
            rule: None,
        }
    }

    fn blocked(command: &str, rule: &str, reason: impl Into<String>, suggestion: Option<&str>) -> Self {
        let mut reason = reason.into();
        if reason.trim().is_empty() {
            reason = "blocked by safety policy".to_string();
        }
        Self {
            verdict: Verdict::Blocked,
            reason,
            command: command.to_string(),
            suggestion: suggestion.map(str::to_string),
            rule: Some(rule.to_string()),
        }
    }

    fn unparseable(command: &str) -> Self {
        Self::blocked(
            command,
            "unparseable",
            "unparseable command",
            Some("send a single plain command without unbalanced quotes or control characters"),
        )
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allowed
    }

    pub fn is_blocked(&self) -> bool {
        self.verdict == Verdict::Blocked
    }
}

/// Tunables for the validator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Return RequiresApproval instead of Blocked for remediation verbs
    #[serde(default)]
    pub remediation_requires_approval: bool,
    /// Additional cloud CLI read-only prefixes (e.g. "az appconfig show")
    #[serde(default)]
    pub extra_cloud_read_only: Vec<String>,
}

/// Validates proposed commands against the safety tables
#[derive(Debug, Clone, Default)]
pub struct CommandSafetyValidator {
    policy: SafetyPolicy,
}

impl CommandSafetyValidator {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Validate with the dialect detected from the command prefix
    pub fn validate_command(&self, command: &str) -> CommandValidation {
        if command.trim().is_empty() {
            return CommandValidation::unparseable(command);
        }
        match Dialect::detect(command) {
            Some(dialect) => self.validate(command, dialect),
            None => {
                let program = command.split_whitespace().next().unwrap_or_default();
                CommandValidation::blocked(
                    command,
                    "unknown_program",
                    format!("`{program}` is not a recognized cluster or cloud CLI (default-deny)"),
                    Some("use kubectl, helm or az read-only commands"),
                )
            }
        }
    }

    /// Validate a command in the given dialect
    pub fn validate(&self, command: &str, dialect: Dialect) -> CommandValidation {
        match dialect {
            Dialect::ToolCall => self.validate_tool_call_json(command),
            Dialect::ClusterCli | Dialect::CloudCli => self.validate_shell(command, dialect),
        }
    }

    /// Validate a structured action
    pub fn validate_tool_call(&self, action: &str, params: &Value) -> CommandValidation {
        let display = format!("{action} {params}");
        if action.trim().is_empty() {
            return CommandValidation::unparseable(&display);
        }

        let action_words = identifier_words(action);
        if let Some(verb) = action_words
            .iter()
            .find(|w| rules::TOOL_ACTION_VERBS.contains(&w.as_str()))
        {
            return CommandValidation::blocked(
                &display,
                "tool_action_verb",
                format!("tool action `{action}` performs `{verb}`"),
                Some("use a get/list/describe style action"),
            );
        }

        let mut strings = Vec::new();
        collect_strings(params, "", &mut strings);
        for (key, value) in strings {
            let hit = value
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                .find(|w| rules::TOOL_PARAM_VERBS.contains(&w.as_str()));
            if let Some(verb) = hit {
                return CommandValidation::blocked(
                    &display,
                    "tool_param_verb",
                    format!("parameter `{key}` requests `{verb}`"),
                    Some("remove mutating verbs from the action parameters"),
                );
            }
        }

        CommandValidation::allowed(&display, "read-only tool action")
    }

    fn validate_tool_call_json(&self, command: &str) -> CommandValidation {
        let Ok(value) = serde_json::from_str::<Value>(command) else {
            return CommandValidation::unparseable(command);
        };
        let action = ["action", "name", "tool"]
            .iter()
            .find_map(|k| value.get(*k).and_then(Value::as_str));
        let Some(action) = action else {
            return CommandValidation::unparseable(command);
        };
        let params = ["params", "parameters", "arguments", "args"]
            .iter()
            .find_map(|k| value.get(*k))
            .cloned()
            .unwrap_or(Value::Null);

        let mut result = self.validate_tool_call(action, &params);
        result.command = command.to_string();
        result
    }

    fn validate_shell(&self, command: &str, dialect: Dialect) -> CommandValidation {
        let parsed = match shell::parse(command) {
            Ok(parsed) => parsed,
            Err(_) => return CommandValidation::unparseable(command),
        };

        if parsed.has_substitution {
            return CommandValidation::blocked(
                command,
                "command_substitution",
                "command substitution is not allowed",
                Some("run the inner command first and pass its output explicitly"),
            );
        }
        if parsed.has_expansion {
            return CommandValidation::blocked(
                command,
                "variable_expansion",
                "shell variable expansion is not allowed",
                Some("write the literal value into the command"),
            );
        }

        let first_program = parsed.stages[0].program().unwrap_or_default();
        let matches_dialect = match dialect {
            Dialect::ClusterCli => matches!(first_program.as_str(), "kubectl" | "oc" | "helm"),
            Dialect::CloudCli => first_program == "az",
            Dialect::ToolCall => false,
        };
        if !matches_dialect {
            return CommandValidation::blocked(
                command,
                "dialect_mismatch",
                format!("`{first_program}` is not a {} command", dialect.as_str()),
                None,
            );
        }

        let mut worst: Option<CommandValidation> = None;
        for stage in &parsed.stages {
            if let Some(target) = stage.output_targets.iter().find(|t| t.as_str() != "/dev/null") {
                return CommandValidation::blocked(
                    command,
                    "output_redirection",
                    format!("output redirection to `{target}` writes files"),
                    Some("let the output return to the caller instead of writing a file"),
                );
            }

            let result = self.validate_stage(command, stage);
            if result.is_blocked() {
                return result;
            }
            let replace = worst
                .as_ref()
                .map_or(true, |w| result.verdict.severity() > w.verdict.severity());
            if replace {
                worst = Some(result);
            }
        }

        worst.unwrap_or_else(|| CommandValidation::allowed(command, "read-only command"))
    }

    fn validate_stage(&self, command: &str, stage: &Stage) -> CommandValidation {
        let program = stage.program().unwrap_or_default();
        match program.as_str() {
            "kubectl" | "oc" => self.check_cluster(
                command,
                stage,
                rules::KUBECTL_RULES,
                rules::KUBECTL_READ_ONLY_VERBS,
            ),
            "helm" => self.check_cluster(command, stage, rules::HELM_RULES, rules::HELM_READ_ONLY_VERBS),
            "az" => self.check_cloud(command, stage),
            "sed" if stage.words.iter().any(|w| w == "-i" || w.starts_with("--in-place")) => {
                CommandValidation::blocked(
                    command,
                    "filter_in_place",
                    "`sed -i` edits files in place",
                    Some("drop -i to filter output only"),
                )
            }
            p if rules::READ_ONLY_FILTERS.contains(&p) => {
                CommandValidation::allowed(command, "read-only filter")
            }
            other => CommandValidation::blocked(
                command,
                "pipeline_stage",
                format!("pipeline stage `{other}` is not a read-only filter"),
                Some("filter output with grep, head, jq or awk only"),
            ),
        }
    }

    fn check_cluster(
        &self,
        command: &str,
        stage: &Stage,
        table: &[ClusterRule],
        read_only: &[&str],
    ) -> CommandValidation {
        let invocation = ClusterInvocation::from_stage(stage);
        let verb = invocation.verb.as_deref().unwrap_or_default();

        if let Some(rule) = table.iter().find(|rule| rule_matches(rule, &invocation)) {
            return self.rule_verdict(command, rule, verb);
        }
        if read_only.contains(&verb) {
            return CommandValidation::allowed(command, "read-only command");
        }

        // an unknown value flag may have taken the subcommand's place
        for word in &invocation.args {
            let word = word.to_lowercase();
            let hit = table
                .iter()
                .filter(|rule| rule.class != RuleClass::LargeOutput)
                .find(|rule| rule.args.is_empty() && rule.verbs.contains(&word.as_str()));
            if let Some(rule) = hit {
                return self.rule_verdict(command, rule, &word);
            }
        }

        let reason = if verb.is_empty() {
            "no subcommand given (default-deny)".to_string()
        } else {
            format!("`{verb}` is not a known read-only subcommand (default-deny)")
        };
        CommandValidation::blocked(
            command,
            "unknown_subcommand",
            reason,
            Some("use get, describe, logs or events"),
        )
    }

    fn rule_verdict(&self, command: &str, rule: &ClusterRule, verb: &str) -> CommandValidation {
        let shown_verb = if verb.is_empty() { "kubectl" } else { verb };
        let reason = rule.reason.replace("{verb}", shown_verb);
        if rule.class == RuleClass::Remediation && self.policy.remediation_requires_approval {
            return CommandValidation {
                verdict: Verdict::RequiresApproval,
                reason,
                command: command.to_string(),
                suggestion: rule.suggestion.map(str::to_string),
                rule: Some(rule.label.to_string()),
            };
        }
        CommandValidation::blocked(command, rule.label, reason, rule.suggestion)
    }

    fn check_cloud(&self, command: &str, stage: &Stage) -> CommandValidation {
        let path: Vec<String> = stage
            .words
            .iter()
            .take_while(|w| !w.starts_with('-'))
            .map(|w| w.to_lowercase())
            .collect();

        let builtin = rules::AZ_READ_ONLY.iter().copied();
        let extra = self.policy.extra_cloud_read_only.iter().map(String::as_str);
        let allowed = builtin.chain(extra).any(|prefix| {
            let prefix: Vec<&str> = prefix.split_whitespace().collect();
            !prefix.is_empty()
                && prefix.len() <= path.len()
                && prefix
                    .iter()
                    .zip(path.iter())
                    .all(|(p, w)| p.eq_ignore_ascii_case(w))
        });
        if allowed {
            return CommandValidation::allowed(command, "read-only cloud command");
        }

        let mutation = path.iter().skip(1).find_map(|token| {
            std::iter::once(token.as_str())
                .chain(token.split('-'))
                .find(|part| rules::CLOUD_MUTATION_VERBS.contains(part))
        });
        if let Some(verb) = mutation {
            return CommandValidation::blocked(
                command,
                "cloud_mutation_verb",
                format!("`{verb}` mutates cloud resources"),
                Some("use the matching `show` or `list` command"),
            );
        }

        CommandValidation::blocked(
            command,
            "cloud_unknown",
            "unknown cloud command (default-deny)",
            Some("only allow-listed read-only cloud commands may run"),
        )
    }
}

/// Subcommand, positional args and flags of one cluster CLI invocation
#[derive(Debug, Default)]
pub(crate) struct ClusterInvocation<'a> {
    pub(crate) verb: Option<String>,
    args: Vec<&'a str>,
    flags: Vec<&'a str>,
}

impl<'a> ClusterInvocation<'a> {
    pub(crate) fn from_stage(stage: &'a Stage) -> Self {
        let mut inv = ClusterInvocation::default();
        let mut words = stage.words.iter().skip(1);
        while let Some(word) = words.next() {
            if word.starts_with('-') && word.len() > 1 {
                inv.flags.push(word.as_str());
                if !word.contains('=') && rules::VALUE_FLAGS.contains(&word.as_str()) {
                    words.next();
                }
            } else if inv.verb.is_none() {
                inv.verb = Some(word.to_lowercase());
            } else {
                inv.args.push(word.as_str());
            }
        }

        // `oc adm drain node-1` is the `drain` subcommand
        let is_adm = stage.program().as_deref() == Some("oc") && inv.verb.as_deref() == Some("adm");
        if is_adm && !inv.args.is_empty() {
            let sub = inv.args.remove(0);
            inv.verb = Some(sub.to_lowercase());
        }
        inv
    }
}

/// Subcommand of a `kubectl`, `oc` or `helm` stage
pub(crate) fn cluster_subcommand(stage: &Stage) -> Option<String> {
    match stage.program().as_deref() {
        Some("kubectl" | "oc" | "helm") => ClusterInvocation::from_stage(stage).verb,
        _ => None,
    }
}

fn rule_matches(rule: &ClusterRule, inv: &ClusterInvocation<'_>) -> bool {
    let verb_ok = rule.verbs.is_empty()
        || inv
            .verb
            .as_deref()
            .is_some_and(|v| rule.verbs.contains(&v));
    let args_ok = rule.args.is_empty()
        || inv
            .args
            .iter()
            .any(|a| rule.args.iter().any(|r| a.eq_ignore_ascii_case(r)));
    let flags_ok = rule.flags.is_empty()
        || inv.flags.iter().any(|f| {
            rule.flags
                .iter()
                .any(|r| *f == *r || f.strip_prefix(r).is_some_and(|rest| rest.starts_with('=')))
        });
    verb_ok && args_ok && flags_ok
}

/// Split an identifier into lowercase words on `_ - . /`, whitespace and camelCase
fn identifier_words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in ident.chars() {
        if c == '_' || c == '-' || c == '.' || c == '/' || c == ':' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Collect `(key path, string value)` pairs from a JSON value
fn collect_strings(value: &Value, path: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(s) => out.push((path.to_string(), s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_strings(item, &format!("{path}[{i}]"), out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                collect_strings(v, &child, out);
            }
        }
        _ => {}
    }
}
