//! Classification tables for the command safety validator.
//!
//! Tables are data: extend them here without touching the evaluation code in
//! `mod.rs`. Cluster rules are evaluated in order and the first match wins.

/// Why a cluster rule blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleClass {
    /// Changes cluster state
    Mutating,
    /// Fixes things; callers may route these through an approval flow
    Remediation,
    /// Opens a session or runs arbitrary code inside a container
    Interactive,
    /// Output too large or never terminates
    LargeOutput,
}

/// One row of a cluster CLI rule table.
///
/// Empty `verbs` matches any subcommand. Empty `args`/`flags` means no
/// requirement; otherwise at least one must be present.
#[derive(Debug)]
pub struct ClusterRule {
    pub label: &'static str,
    pub class: RuleClass,
    pub verbs: &'static [&'static str],
    pub args: &'static [&'static str],
    pub flags: &'static [&'static str],
    /// `{verb}` is replaced by the matched subcommand
    pub reason: &'static str,
    pub suggestion: Option<&'static str>,
}

pub static KUBECTL_RULES: &[ClusterRule] = &[
    ClusterRule {
        label: "mutating_verb",
        class: RuleClass::Mutating,
        verbs: &[
            "create", "apply", "edit", "replace", "patch", "cordon", "uncordon", "drain",
            "taint", "annotate", "label", "cp", "expose", "run", "autoscale",
        ],
        args: &[],
        flags: &[],
        reason: "`{verb}` is a mutating operation; investigations are read-only",
        suggestion: Some("inspect the object with `kubectl get` or `kubectl describe` instead"),
    },
    ClusterRule {
        label: "remediation_verb",
        class: RuleClass::Remediation,
        verbs: &["delete", "rollout", "scale", "set"],
        args: &[],
        flags: &[],
        reason: "`{verb}` is a remediation action and needs operator approval",
        suggestion: Some("report the proposed fix instead of applying it"),
    },
    ClusterRule {
        label: "interactive_verb",
        class: RuleClass::Interactive,
        verbs: &["exec", "attach", "port-forward", "proxy", "debug", "rsh", "rsync"],
        args: &[],
        flags: &[],
        reason: "`{verb}` runs code or opens a session inside the cluster",
        suggestion: Some("read container state with `kubectl logs --tail=200` or `kubectl describe`"),
    },
    ClusterRule {
        label: "certificate_decision",
        class: RuleClass::Mutating,
        verbs: &["certificate"],
        args: &["approve", "deny"],
        flags: &[],
        reason: "`{verb} approve|deny` decides a certificate signing request",
        suggestion: Some("inspect the request with `kubectl get csr` or `kubectl describe csr`"),
    },
    ClusterRule {
        label: "auth_reconcile",
        class: RuleClass::Mutating,
        verbs: &["auth"],
        args: &["reconcile"],
        flags: &[],
        reason: "`{verb} reconcile` writes RBAC objects",
        suggestion: Some("check permissions with `kubectl auth can-i`"),
    },
    ClusterRule {
        label: "kubeconfig_write",
        class: RuleClass::Mutating,
        verbs: &["config"],
        args: &[
            "set", "unset", "set-context", "set-cluster", "set-credentials", "use-context", "use",
            "delete-context", "delete-cluster", "delete-user", "rename-context",
        ],
        flags: &[],
        reason: "this `{verb}` subcommand rewrites the kubeconfig",
        suggestion: Some("read the kubeconfig with `kubectl config view` or `kubectl config get-contexts`"),
    },
    ClusterRule {
        label: "unbounded_get_all",
        class: RuleClass::LargeOutput,
        verbs: &["get"],
        args: &["all"],
        flags: &["-A", "--all-namespaces"],
        reason: "`{verb} all` across all namespaces produces unbounded output",
        suggestion: Some("query specific resource types or scope with -n <namespace>"),
    },
    ClusterRule {
        label: "top",
        class: RuleClass::LargeOutput,
        verbs: &["top"],
        args: &[],
        flags: &[],
        reason: "`{verb}` output is unbounded and depends on metrics-server",
        suggestion: Some("use `kubectl describe node` or the pod's resource requests"),
    },
    ClusterRule {
        label: "follow_logs",
        class: RuleClass::LargeOutput,
        verbs: &["logs"],
        args: &[],
        flags: &["-f", "--follow"],
        reason: "`{verb} -f` never terminates",
        suggestion: Some("use `kubectl logs <pod> --tail=200` without -f"),
    },
    ClusterRule {
        label: "watch_mode",
        class: RuleClass::LargeOutput,
        verbs: &[],
        args: &[],
        flags: &["-w", "--watch", "--watch-only"],
        reason: "watch mode on `{verb}` never terminates",
        suggestion: Some("drop --watch and re-run the query"),
    },
];

pub static HELM_RULES: &[ClusterRule] = &[ClusterRule {
    label: "helm_mutating_verb",
    class: RuleClass::Mutating,
    verbs: &[
        "install", "upgrade", "uninstall", "delete", "rollback", "push", "create", "package",
        "plugin", "repo",
    ],
    args: &[],
    flags: &[],
    reason: "`helm {verb}` changes releases or local helm state",
    suggestion: Some("inspect releases with `helm list -A` or `helm status <release>`"),
}];

/// Subcommands of `kubectl` and `oc` that only read. Anything else that no
/// rule names is denied.
pub static KUBECTL_READ_ONLY_VERBS: &[&str] = &[
    "get", "describe", "logs", "explain", "events", "api-resources", "api-versions", "version",
    "cluster-info", "auth", "config", "status", "whoami", "projects",
];

/// Subcommands of `helm` that only read
pub static HELM_READ_ONLY_VERBS: &[&str] = &[
    "list", "ls", "status", "get", "history", "hist", "show", "inspect", "search", "version",
    "env", "template", "lint", "verify",
];

/// Flags that consume the following word as their value. Needed to find the
/// subcommand in `kubectl -n prod get pods` and positional args after it.
pub static VALUE_FLAGS: &[&str] = &[
    "-n", "--namespace", "--context", "--kubeconfig", "--cluster", "--user", "-s", "--server",
    "--as", "--as-group", "--as-uid", "--token", "--username", "--password",
    "--certificate-authority", "--client-certificate", "--client-key", "--tls-server-name",
    "--cache-dir", "--profile", "--profile-output", "-v", "--v", "--vmodule", "--log-file",
    "-l", "--selector", "-o", "--output", "-c", "--container", "--field-selector", "--sort-by",
    "--tail", "--since", "--since-time", "-L", "--label-columns", "--request-timeout",
    "--chunk-size", "--template", "--kube-context", "--kube-apiserver", "--kube-token",
    "--kube-as-user", "--kube-as-group", "--kube-ca-file", "--registry-config",
    "--repository-config", "--repository-cache", "--revision", "--max", "--offset", "--filter",
    "--max-log-requests",
];

/// Programs allowed as non-cluster stages of a pipeline
pub static READ_ONLY_FILTERS: &[&str] = &[
    "grep", "egrep", "fgrep", "head", "tail", "wc", "sort", "uniq", "awk", "cut", "jq", "yq",
    "column", "tr", "sed", "cat", "less", "nl",
];

/// Azure CLI read-only command prefixes (token prefixes of the command path)
pub static AZ_READ_ONLY: &[&str] = &[
    "az version",
    "az account show",
    "az account list",
    "az group show",
    "az group list",
    "az group exists",
    "az resource show",
    "az resource list",
    "az provider show",
    "az provider list",
    "az aks show",
    "az aks list",
    "az aks get-versions",
    "az aks nodepool show",
    "az aks nodepool list",
    "az monitor activity-log list",
    "az monitor metrics list",
    "az monitor diagnostic-settings list",
    "az eventhubs namespace show",
    "az eventhubs namespace list",
    "az eventhubs eventhub show",
    "az eventhubs eventhub list",
    "az eventhubs eventhub consumer-group list",
    "az servicebus namespace show",
    "az servicebus namespace list",
    "az network vnet show",
    "az network vnet list",
    "az network vnet subnet show",
    "az network vnet subnet list",
    "az network nsg show",
    "az network nsg list",
    "az network private-endpoint show",
    "az network private-endpoint list",
    "az storage account show",
    "az storage account list",
    "az keyvault show",
    "az keyvault list",
    "az identity show",
    "az identity list",
    "az role assignment list",
    "az role definition list",
    "az ad sp show",
    "az ad sp list",
    "az vm show",
    "az vm list",
    "az sql server show",
    "az sql server list",
    "az postgres flexible-server show",
    "az postgres flexible-server list",
    "az cosmosdb show",
    "az cosmosdb list",
    "az redis show",
    "az redis list",
    "az acr show",
    "az acr list",
    "az acr repository list",
];

/// Cloud CLI mutation vocabulary, matched against whole command-path tokens
/// and their hyphen-separated parts (`set-policy` -> `set`)
pub static CLOUD_MUTATION_VERBS: &[&str] = &[
    "create", "delete", "update", "set", "start", "stop", "restart", "remove", "add", "purge",
    "deallocate", "reset", "rotate", "regenerate", "import", "upgrade", "scale", "assign",
    "deploy", "move", "invoke", "run", "apply", "enable", "disable", "attach", "detach",
    "renew", "restore", "failover", "lock", "unlock", "grant", "revoke", "install",
    "uninstall", "reimage", "redeploy", "resize", "swap", "sync", "put", "patch", "approve",
    "reject", "cancel", "abort", "login", "logout",
];

/// Verbs that make a structured tool action mutating
pub static TOOL_ACTION_VERBS: &[&str] = &[
    "create", "update", "delete", "patch", "put", "post", "remove", "apply", "replace",
    "scale", "restart", "drain", "cordon", "destroy", "write", "modify", "insert", "upsert",
    "set", "edit", "kill", "terminate", "rollback", "install", "uninstall", "exec",
];

/// Narrower list for free-text string parameters, where words like `set`
/// appear in ordinary prose
pub static TOOL_PARAM_VERBS: &[&str] = &[
    "create", "update", "delete", "patch", "put", "post", "remove", "apply", "replace",
    "destroy", "upsert", "drain", "cordon", "terminate",
];
