//! Error signature catalog.
//!
//! Known failure modes of cluster workloads, controllers and cloud providers,
//! each mapped to a diagnosis, an investigation strategy and a hint for the
//! reflection loop. The table is ordered: more specific signatures come first,
//! and the first match wins.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// One known failure mode
#[derive(Debug)]
pub struct ErrorSignature {
    pub id: &'static str,
    pub pattern: Regex,
    /// What is wrong
    pub diagnosis: &'static str,
    /// What to investigate next
    pub strategy: &'static str,
    /// Short hint for the model
    pub hint: &'static str,
}

/// A signature that matched some text
#[derive(Debug, Clone, Serialize)]
pub struct SignatureMatch {
    pub id: &'static str,
    pub diagnosis: &'static str,
    pub strategy: &'static str,
    pub hint: &'static str,
    /// The matched excerpt from the input
    pub excerpt: String,
}

impl SignatureMatch {
    fn from_signature(sig: &ErrorSignature, excerpt: &str) -> Self {
        Self {
            id: sig.id,
            diagnosis: sig.diagnosis,
            strategy: sig.strategy,
            hint: sig.hint,
            excerpt: excerpt.to_string(),
        }
    }
}

fn sig(
    id: &'static str,
    pattern: &str,
    diagnosis: &'static str,
    strategy: &'static str,
    hint: &'static str,
) -> ErrorSignature {
    ErrorSignature {
        id,
        pattern: Regex::new(pattern).unwrap(),
        diagnosis,
        strategy,
        hint,
    }
}

static SIGNATURES: LazyLock<Vec<ErrorSignature>> = LazyLock::new(|| {
    vec![
        // Cloud provider authorization
        sig(
            "cloud_authorization_failed",
            r"(?i)\bAuthorizationFailed\b|does not have authorization to perform action",
            "The provider identity lacks a role assignment for this operation",
            "Find the ProviderConfig credentials and list role assignments for that identity",
            "Look for the client/object id in the error and compare with role assignments on the scope",
        ),
        sig(
            "cloud_resource_group_missing",
            r"(?i)\bResourceGroupNotFound\b|resource group '[^']+' could not be found",
            "The target resource group does not exist in the subscription",
            "Check the resourceGroupName field and whether the ResourceGroup managed resource is Ready",
            "A missing or not-yet-ready resource group blocks every child resource",
        ),
        sig(
            "cloud_invalid_parameter",
            r"(?i)\b(InvalidParameter|InvalidRequestContent|BadRequest)\b",
            "The cloud API rejected a field value in the resource spec",
            "Compare spec.forProvider with the API constraints named in the error",
            "The error body usually names the offending property",
        ),
        sig(
            "cloud_quota_exceeded",
            r"(?i)quota\s*(exceeded|limit)|\bQuotaExceeded\b|OperationNotAllowed.*quota",
            "A subscription or regional quota is exhausted",
            "Check usage against quota for the region and SKU in the error",
            "Quota errors are not fixed by retrying",
        ),
        // Crossplane / provider controllers
        sig(
            "provider_config_missing",
            r#"(?i)(cannot get referenced ProviderConfig|ProviderConfig(\.[a-z.]+)?\s+"?[\w-]+"?\s+not found)"#,
            "The resource points at a ProviderConfig that does not exist",
            "List providerconfigs and compare with spec.providerConfigRef.name",
            "The default ProviderConfig is named 'default'",
        ),
        sig(
            "reference_unresolved",
            r"(?i)cannot resolve references|referenced resource (is )?not (found|ready)|cannot get referenced",
            "A cross-resource reference or selector does not resolve to a ready object",
            "Follow the *Ref/*Selector fields and check the referenced object's Ready condition",
            "Fix the dependency first; the dependent resource recovers on the next reconcile",
        ),
        sig(
            "unknown_kind",
            r#"(?i)no matches for kind|the server doesn't have a resource type|could not find the requested resource"#,
            "The CRD for this kind is not installed or the API version is wrong",
            "Run api-resources and check the CRD and its served versions",
            "Provider packages install their CRDs; an unhealthy provider means no CRDs",
        ),
        // Workload failures
        sig(
            "image_pull_failure",
            r"(?i)\b(ImagePullBackOff|ErrImagePull|InvalidImageName)\b|failed to pull image",
            "The container image cannot be pulled",
            "Check the image reference, tag existence and imagePullSecrets",
            "'manifest unknown' means wrong tag; 'unauthorized' means registry credentials",
        ),
        sig(
            "oom_killed",
            r"(?i)\bOOMKilled\b|out of memory|memory cgroup out of memory",
            "The container exceeded its memory limit and was killed",
            "Compare resources.limits.memory with actual usage before the kill",
            "Exit code 137 together with OOMKilled confirms it",
        ),
        sig(
            "crash_loop",
            r"(?i)\bCrashLoopBackOff\b|back-off restarting failed container",
            "The container starts and exits repeatedly",
            "Read the previous container logs with --previous",
            "The crash reason is in the last lines of the previous instance",
        ),
        sig(
            "scheduling_failed",
            r"(?i)\bFailedScheduling\b|Insufficient (cpu|memory)|didn't match (node selector|Pod's node affinity)|untolerated taint",
            "No node can host the pod",
            "Describe the pod and compare requests, selectors and tolerations with node capacity",
            "The FailedScheduling event lists why each node was rejected",
        ),
        sig(
            "volume_mount_failed",
            r"(?i)\bFailedMount\b|\bFailedAttachVolume\b|MountVolume\.SetUp failed",
            "A volume or secret/configmap mount cannot be set up",
            "Check the referenced PVC, secret or configmap exists in the pod's namespace",
            "Missing secrets show up as FailedMount, not as a crash",
        ),
        // Access and transport
        sig(
            "rbac_forbidden",
            r"(?i)\bis forbidden\b|\bforbidden:|cannot (get|list|watch|create|update|patch|delete) resource",
            "The service account lacks RBAC permission",
            "Identify the service account and check its roles with auth can-i",
            "The error names the verb, resource and API group that were denied",
        ),
        sig(
            "certificate_error",
            r"(?i)x509:|certificate (has expired|is not valid|signed by unknown authority)|tls: (bad certificate|handshake failure)",
            "TLS verification failed",
            "Check certificate expiry and the CA bundle used by the client",
            "Webhook CA bundles going stale is a common cause",
        ),
        sig(
            "connection_refused",
            r"(?i)connection refused|no route to host|dial tcp [^\s]+: connect",
            "The target endpoint is not accepting connections",
            "Check the service endpoints and whether backing pods are Ready",
            "An empty endpoints list means no ready pods match the selector",
        ),
        sig(
            "timeout",
            r"(?i)context deadline exceeded|i/o timeout|timed out waiting|\bTimeout\b",
            "An operation did not complete in time",
            "Find which call timed out and check that dependency's health",
            "Timeouts are usually a symptom; look for the slow dependency",
        ),
        sig(
            "already_exists",
            r"(?i)already exists|\bConflict\b|name is already in use|\bStorageAccountAlreadyTaken\b",
            "A resource with the same name already exists",
            "Check for an existing external resource or a duplicate managed resource",
            "Globally unique cloud names collide across subscriptions",
        ),
    ]
});

/// Ordered catalog of known failure signatures
pub struct ErrorSignatureCatalog;

impl ErrorSignatureCatalog {
    /// First signature matching `text`, in table order
    pub fn match_first(text: &str) -> Option<SignatureMatch> {
        SIGNATURES.iter().find_map(|sig| {
            sig.pattern
                .find(text)
                .map(|m| SignatureMatch::from_signature(sig, m.as_str()))
        })
    }

    /// Every signature matching `text`, each at most once, in table order
    pub fn match_all(text: &str) -> Vec<SignatureMatch> {
        SIGNATURES
            .iter()
            .filter_map(|sig| {
                sig.pattern
                    .find(text)
                    .map(|m| SignatureMatch::from_signature(sig, m.as_str()))
            })
            .collect()
    }

    pub fn len() -> usize {
        SIGNATURES.len()
    }

    pub fn ids() -> Vec<&'static str> {
        SIGNATURES.iter().map(|s| s.id).collect()
    }
}
