//! The immutable outcome of one analysis run.

use orthospec_dsl::spec_v1::{EntryRole, Name};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Severity};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeparatorCount {
    /// Separators written inline in the variable's own body.
    pub direct: usize,
    /// Separators with every reference inlined.
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariableSummary {
    pub name: Name,
    pub counts: SeparatorCount,
    /// Variables referenced from the body, first occurrence order.
    pub references: Vec<Name>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SliceStatus {
    Complete,
    /// Keys ran out part way through this component.
    Truncated,
    /// The component starts past the last key.
    Overflow,
}

/// One item of a component. Inline items (anything but a bare reference) are
/// attributed to the entry variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemMapping {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<Name>,
    pub separators: usize,
    pub start: usize,
    pub keys: Vec<Name>,
}

/// A maximal run of top-level entry items between separator markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentMapping {
    pub index: usize,
    pub label: String,
    pub separators: usize,
    pub start: usize,
    pub keys: Vec<Name>,
    pub status: SliceStatus,
    pub items: Vec<ItemMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryPointReport {
    pub role: EntryRole,
    pub variable: Name,
    /// `keys - 1`; `None` when the specification declares no keys.
    pub expected: Option<usize>,
    pub actual: usize,
    pub components: Vec<ComponentMapping>,
    /// Trailing keys no component reached (underflow).
    pub unassigned_keys: Vec<Name>,
}

impl EntryPointReport {
    pub fn is_consistent(&self) -> bool {
        self.expected == Some(self.actual)
            && self.unassigned_keys.is_empty()
            && self
                .components
                .iter()
                .all(|c| c.status == SliceStatus::Complete)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    pub variable: Name,
    /// Entry point that assigned the slice.
    pub role: EntryRole,
    pub start: usize,
    pub keys: Vec<Name>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Name>,
    pub digest: String,
    pub keys: Vec<Name>,
    /// Declaration order.
    pub variables: Vec<VariableSummary>,
    pub entry_points: Vec<EntryPointReport>,
    /// Declaration order of the mapped variable.
    pub field_mappings: Vec<FieldMapping>,
    pub unmapped: Vec<Name>,
    pub diagnostics: Vec<Diagnostic>,
}

/// How a caller turns diagnostics into an accept/reject decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Reject only when an `Error` was recorded.
    #[default]
    Lenient,
    /// Reject on any diagnostic.
    Strict,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("specification rejected ({policy:?}): {errors} error(s), {warnings} warning(s); first: {first}")]
pub struct RejectedSpec {
    pub policy: Policy,
    pub errors: usize,
    pub warnings: usize,
    pub first: String,
}

impl AnalysisResult {
    pub fn count(&self, name: &str) -> Option<SeparatorCount> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.counts)
    }

    pub fn mapping(&self, name: &str) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|m| m.variable == name)
    }

    pub fn entry(&self, role: EntryRole) -> Option<&EntryPointReport> {
        self.entry_points.iter().find(|e| e.role == role)
    }

    pub fn is_unmapped(&self, name: &str) -> bool {
        self.unmapped.iter().any(|n| n == name)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn diagnostics_with_code<'a>(
        &'a self,
        code: &'a str,
    ) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code() == code)
    }

    pub fn accept(&self, policy: Policy) -> Result<(), RejectedSpec> {
        let first = match policy {
            Policy::Lenient => self.diagnostics.iter().find(|d| d.is_error()),
            Policy::Strict => self.diagnostics.first(),
        };
        match first {
            None => Ok(()),
            Some(d) => Err(RejectedSpec {
                policy,
                errors: self.error_count(),
                warnings: self.warning_count(),
                first: d.to_string(),
            }),
        }
    }
}
