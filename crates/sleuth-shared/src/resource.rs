//! Resource references and the ownership chain built during one investigation.
//!
//! A `ResourceChain` starts at the object the user asked about and grows as the
//! investigation walks owner references, lists children, and finds related
//! objects (services selecting the pods, secrets mounted by them, ...). It is
//! never persisted beyond the query that built it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Result, SleuthError};

/// Typed reference to a cluster object.
///
/// Equality and hashing use `(kind, name, namespace)`; `api_version` is
/// informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(
        default,
        rename = "apiVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_version: Option<String>,
}

impl ResourceRef {
    /// Namespaced reference. Kind is stored lowercased.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            kind: kind.into().to_lowercase(),
            name: name.into(),
            namespace: namespace
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            api_version: None,
        }
    }

    /// Cluster-scoped reference (nodes, CRDs, namespaces, ...)
    pub fn cluster_scoped(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(kind, name, None)
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Parse `kind/name` or `namespace/kind/name`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(SleuthError::InvalidResourceRef(s.to_string()));
        }
        match parts.as_slice() {
            [kind, name] => Ok(Self::new(*kind, *name, None)),
            [ns, kind, name] => Ok(Self::new(*kind, *name, Some(ns))),
            _ => Err(SleuthError::InvalidResourceRef(s.to_string())),
        }
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespace.is_some()
    }

    /// Read-only command that shows this object in detail.
    pub fn describe_command(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("kubectl describe {} {} -n {}", self.kind, self.name, ns),
            None => format!("kubectl describe {} {}", self.kind, self.name),
        }
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.namespace == other.namespace
    }
}

impl Eq for ResourceRef {}

impl Hash for ResourceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
        self.namespace.hash(state);
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", ns, self.kind, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// A warning event observed on some object in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningEvent {
    pub reason: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub involved: Option<ResourceRef>,
    #[serde(default = "default_event_count")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

fn default_event_count() -> u32 {
    1
}

impl WarningEvent {
    pub fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
            involved: None,
            count: default_event_count(),
            last_seen: None,
        }
    }

    pub fn on(mut self, involved: ResourceRef) -> Self {
        self.involved = Some(involved);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }
}

/// Owner/child/related graph rooted at the resource under investigation.
///
/// Invariant: `root` never appears in `owners`, `children` or `related`.
/// Children and related are sets (insertion-ordered, no duplicates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChain {
    root: ResourceRef,
    /// child → parent order: `owners[0]` owns the root directly
    owners: Vec<ResourceRef>,
    children: Vec<ResourceRef>,
    related: Vec<ResourceRef>,
    events: Vec<WarningEvent>,
}

impl ResourceChain {
    pub fn new(root: ResourceRef) -> Self {
        Self {
            root,
            owners: Vec::new(),
            children: Vec::new(),
            related: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn root(&self) -> &ResourceRef {
        &self.root
    }

    pub fn owners(&self) -> &[ResourceRef] {
        &self.owners
    }

    pub fn children(&self) -> &[ResourceRef] {
        &self.children
    }

    pub fn related(&self) -> &[ResourceRef] {
        &self.related
    }

    pub fn events(&self) -> &[WarningEvent] {
        &self.events
    }

    /// Append the next owner up the chain. Returns false for the root or a duplicate.
    pub fn add_owner(&mut self, owner: ResourceRef) -> bool {
        if owner == self.root || self.owners.contains(&owner) {
            return false;
        }
        self.owners.push(owner);
        true
    }

    pub fn add_child(&mut self, child: ResourceRef) -> bool {
        if child == self.root || self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    pub fn add_related(&mut self, related: ResourceRef) -> bool {
        if related == self.root || self.related.contains(&related) {
            return false;
        }
        self.related.push(related);
        true
    }

    pub fn add_event(&mut self, event: WarningEvent) {
        self.events.push(event);
    }

    /// The outermost known owner, or the root when nothing owns it.
    pub fn top_owner(&self) -> &ResourceRef {
        self.owners.last().unwrap_or(&self.root)
    }

    pub fn contains(&self, resource: &ResourceRef) -> bool {
        self.all_resources().any(|r| r == resource)
    }

    /// Root, owners, children, related, in that order.
    pub fn all_resources(&self) -> impl Iterator<Item = &ResourceRef> {
        std::iter::once(&self.root)
            .chain(self.owners.iter())
            .chain(self.children.iter())
            .chain(self.related.iter())
    }

    /// Multi-line trace used in prompts and logs.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("root: {}", self.root)];
        if !self.owners.is_empty() {
            let path: Vec<String> = self.owners.iter().map(ToString::to_string).collect();
            lines.push(format!("owned by: {}", path.join(" -> ")));
        }
        if !self.children.is_empty() {
            let kids: Vec<String> = self.children.iter().map(ToString::to_string).collect();
            lines.push(format!("children: {}", kids.join(", ")));
        }
        if !self.related.is_empty() {
            let rel: Vec<String> = self.related.iter().map(ToString::to_string).collect();
            lines.push(format!("related: {}", rel.join(", ")));
        }
        for event in &self.events {
            let target = event
                .involved
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| self.root.to_string());
            lines.push(format!(
                "warning {} on {} (x{}): {}",
                event.reason, target, event.count, event.message
            ));
        }
        lines.join("\n")
    }
}
