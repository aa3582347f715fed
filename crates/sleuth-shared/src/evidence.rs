//! Evidence collected during one investigation session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SleuthError};

/// Names of the evidence slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceField {
    CrdType,
    ResourceName,
    Namespace,
    StatusState,
    ControllerPod,
    ControllerNamespace,
    ControllerLogsChecked,
    ErrorMessage,
    RootCauseIdentified,
}

impl EvidenceField {
    pub const ALL: [EvidenceField; 9] = [
        EvidenceField::CrdType,
        EvidenceField::ResourceName,
        EvidenceField::Namespace,
        EvidenceField::StatusState,
        EvidenceField::ControllerPod,
        EvidenceField::ControllerNamespace,
        EvidenceField::ControllerLogsChecked,
        EvidenceField::ErrorMessage,
        EvidenceField::RootCauseIdentified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceField::CrdType => "crd_type",
            EvidenceField::ResourceName => "resource_name",
            EvidenceField::Namespace => "namespace",
            EvidenceField::StatusState => "status_state",
            EvidenceField::ControllerPod => "controller_pod",
            EvidenceField::ControllerNamespace => "controller_namespace",
            EvidenceField::ControllerLogsChecked => "controller_logs_checked",
            EvidenceField::ErrorMessage => "error_message",
            EvidenceField::RootCauseIdentified => "root_cause_identified",
        }
    }
}

impl fmt::Display for EvidenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceField {
    type Err = SleuthError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        EvidenceField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| SleuthError::UnknownEvidenceField(s.to_string()))
    }
}

/// Partial evidence for one investigation.
///
/// Each slot is write-once until reset: `record` never overwrites evidence
/// the session already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebuggingContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_pod: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_namespace: Option<String>,
    #[serde(default)]
    pub controller_logs_checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause_identified: Option<String>,
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "yes" | "1" | "checked" | "done"
    )
}

impl DebuggingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loose `(name, value)` pairs. Unknown names are rejected;
    /// blank values are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut ctx = Self::default();
        for (key, value) in pairs {
            let field: EvidenceField = key.as_ref().parse()?;
            ctx.record(field, value.as_ref());
        }
        Ok(ctx)
    }

    fn slot_mut(&mut self, field: EvidenceField) -> Option<&mut Option<String>> {
        match field {
            EvidenceField::CrdType => Some(&mut self.crd_type),
            EvidenceField::ResourceName => Some(&mut self.resource_name),
            EvidenceField::Namespace => Some(&mut self.namespace),
            EvidenceField::StatusState => Some(&mut self.status_state),
            EvidenceField::ControllerPod => Some(&mut self.controller_pod),
            EvidenceField::ControllerNamespace => Some(&mut self.controller_namespace),
            EvidenceField::ErrorMessage => Some(&mut self.error_message),
            EvidenceField::RootCauseIdentified => Some(&mut self.root_cause_identified),
            EvidenceField::ControllerLogsChecked => None,
        }
    }

    /// Text value of a slot; `"true"` for the logs flag when set
    pub fn get(&self, field: EvidenceField) -> Option<&str> {
        let slot = match field {
            EvidenceField::CrdType => &self.crd_type,
            EvidenceField::ResourceName => &self.resource_name,
            EvidenceField::Namespace => &self.namespace,
            EvidenceField::StatusState => &self.status_state,
            EvidenceField::ControllerPod => &self.controller_pod,
            EvidenceField::ControllerNamespace => &self.controller_namespace,
            EvidenceField::ErrorMessage => &self.error_message,
            EvidenceField::RootCauseIdentified => &self.root_cause_identified,
            EvidenceField::ControllerLogsChecked => {
                return self.controller_logs_checked.then_some("true");
            }
        };
        slot.as_deref()
    }

    pub fn has(&self, field: EvidenceField) -> bool {
        self.get(field).is_some()
    }

    /// Record evidence. Returns false when the value is blank or the slot
    /// already holds evidence.
    pub fn record(&mut self, field: EvidenceField, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        match self.slot_mut(field) {
            Some(slot) => {
                if slot.is_some() {
                    return false;
                }
                *slot = Some(value.to_string());
                true
            }
            None => is_truthy(value) && self.mark_logs_checked(),
        }
    }

    /// Set the controller-logs flag. Returns false if it was already set.
    pub fn mark_logs_checked(&mut self) -> bool {
        if self.controller_logs_checked {
            return false;
        }
        self.controller_logs_checked = true;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn reset_field(&mut self, field: EvidenceField) {
        match self.slot_mut(field) {
            Some(slot) => *slot = None,
            None => self.controller_logs_checked = false,
        }
    }

    /// Fields that currently hold evidence, in declaration order
    pub fn present_fields(&self) -> Vec<EvidenceField> {
        EvidenceField::ALL
            .iter()
            .copied()
            .filter(|f| self.has(*f))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }
}
