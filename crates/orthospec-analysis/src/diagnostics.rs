//! Diagnostics recorded while analyzing a pattern graph.
//!
//! Only graph construction can abort analysis. Everything here is accumulated
//! and returned next to best-effort results; the caller decides whether an
//! `Error` rejects the specification.

use std::collections::BTreeMap;
use std::fmt;

use orthospec_dsl::spec_v1::{EntryRole, Name};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong when an entry point's separators do not line up with the
/// feature keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum MismatchDetail {
    /// Total separator count differs from `keys - 1`.
    Count,
    /// Components ran out before the keys did.
    Underflow { unassigned_keys: Vec<Name> },
    /// Keys ran out before the components did.
    Overflow { unmapped_components: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The variable transitively references itself; `cycle` is the reference
    /// path, closed (first name repeated at the end).
    CyclicReference { cycle: Vec<Name> },
    InconsistentUnionBranches { branch_counts: Vec<usize> },
    EntryPointSeparatorMismatch {
        role: EntryRole,
        expected: Option<usize>,
        actual: usize,
        detail: MismatchDetail,
    },
    DuplicateFeatureKey { key: Name, positions: Vec<usize> },
    /// A variable was assigned a second, different key slice; the first one is kept.
    ConflictingFieldMapping {
        role: EntryRole,
        kept: Vec<Name>,
        rejected: Vec<Name>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<Name>,
    pub kind: DiagnosticKind,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::CyclicReference { .. } => "cyclic_reference",
            DiagnosticKind::InconsistentUnionBranches { .. } => "inconsistent_union_branches",
            DiagnosticKind::EntryPointSeparatorMismatch { .. } => "entry_point_separator_mismatch",
            DiagnosticKind::DuplicateFeatureKey { .. } => "duplicate_feature_key",
            DiagnosticKind::ConflictingFieldMapping { .. } => "conflicting_field_mapping",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::CyclicReference { .. } => Severity::Error,
            DiagnosticKind::InconsistentUnionBranches { .. }
            | DiagnosticKind::EntryPointSeparatorMismatch { .. }
            | DiagnosticKind::DuplicateFeatureKey { .. }
            | DiagnosticKind::ConflictingFieldMapping { .. } => Severity::Warning,
        }
    }
}

impl Diagnostic {
    pub fn new(variable: Option<&str>, kind: DiagnosticKind) -> Self {
        Self {
            severity: kind.severity(),
            variable: variable.map(str::to_string),
            kind,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// One warning per key that appears more than once, in first-occurrence order.
pub fn duplicate_key_diagnostics(keys: &[Name]) -> Vec<Diagnostic> {
    let mut positions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        let slot = positions.entry(key.as_str()).or_default();
        if slot.is_empty() {
            order.push(key);
        }
        slot.push(i);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let at = positions.remove(key)?;
            (at.len() > 1).then(|| {
                Diagnostic::new(
                    None,
                    DiagnosticKind::DuplicateFeatureKey {
                        key: key.to_string(),
                        positions: at,
                    },
                )
            })
        })
        .collect()
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::CyclicReference { cycle } => {
                write!(f, "reference cycle {}", cycle.join(" -> "))
            }
            DiagnosticKind::InconsistentUnionBranches { branch_counts } => write!(
                f,
                "union branches disagree on separator count {branch_counts:?}; using the first ({})",
                branch_counts.first().copied().unwrap_or(0)
            ),
            DiagnosticKind::EntryPointSeparatorMismatch {
                role,
                expected,
                actual,
                detail,
            } => {
                write!(f, "{role} entry point has {actual} separator(s), ")?;
                match expected {
                    Some(n) => write!(f, "expected {n}")?,
                    None => write!(f, "but no feature keys are declared")?,
                }
                match detail {
                    MismatchDetail::Count => Ok(()),
                    MismatchDetail::Underflow { unassigned_keys } => {
                        write!(f, " (underflow; unassigned keys: {})", unassigned_keys.join(", "))
                    }
                    MismatchDetail::Overflow {
                        unmapped_components,
                    } => write!(
                        f,
                        " (overflow; unmapped components: {})",
                        unmapped_components.join(", ")
                    ),
                }
            }
            DiagnosticKind::DuplicateFeatureKey { key, positions } => {
                write!(f, "feature key `{key}` appears at positions {positions:?}")
            }
            DiagnosticKind::ConflictingFieldMapping {
                role,
                kept,
                rejected,
            } => write!(
                f,
                "{role} entry point maps the variable to [{}] but it already governs [{}]",
                rejected.join(", "),
                kept.join(", ")
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.code())?;
        if let Some(v) = &self.variable {
            write!(f, " `{v}`")?;
        }
        write!(f, ": {}", self.kind)
    }
}
