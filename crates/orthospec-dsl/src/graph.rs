//! Checked pattern graph over a `spec_v1` document.
//!
//! Loading is permissive: a document may contain explicit references to
//! variables it never declares. Analysis needs every reference resolved, so
//! downstream code accepts a `PatternGraph` instead of a raw
//! `OrthographySpecV1`:
//!
//! - construction is checked (fail-closed),
//! - the graph is never mutated afterwards,
//! - name lookups are indexed.
//!
//! Construction validates reference resolution only. Separator counts, union
//! consistency and field coverage are the analyzer's job.

use std::collections::HashMap;

use thiserror::Error;

use crate::spec_v1::{
    EntryPointV1, EntryRole, Name, OrthographySpecV1, PatternExprV1, PatternVariableV1,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphBuildError {
    #[error("variable `{container}` references undefined variable `{reference}`")]
    UndefinedVariable { reference: Name, container: Name },
    #[error("{role} entry point names undefined variable `{variable}`")]
    UndefinedEntryPoint { role: EntryRole, variable: Name },
    #[error("variable `{name}` is defined more than once")]
    DuplicateVariable { name: Name },
}

#[derive(Debug, Clone)]
pub struct PatternGraph {
    spec: OrthographySpecV1,
    index: HashMap<Name, usize>,
}

impl PatternGraph {
    pub fn build(spec: OrthographySpecV1) -> Result<Self, GraphBuildError> {
        let mut index: HashMap<Name, usize> = HashMap::new();
        for (i, var) in spec.variables.iter().enumerate() {
            if index.insert(var.name.clone(), i).is_some() {
                return Err(GraphBuildError::DuplicateVariable {
                    name: var.name.clone(),
                });
            }
        }

        for var in &spec.variables {
            if let Some(missing) = var
                .body
                .references()
                .into_iter()
                .find(|r| !index.contains_key(*r))
            {
                return Err(GraphBuildError::UndefinedVariable {
                    reference: missing.to_string(),
                    container: var.name.clone(),
                });
            }
        }

        for entry in &spec.entry_points {
            if !index.contains_key(&entry.variable) {
                return Err(GraphBuildError::UndefinedEntryPoint {
                    role: entry.role,
                    variable: entry.variable.clone(),
                });
            }
        }

        Ok(Self { spec, index })
    }

    pub fn spec(&self) -> &OrthographySpecV1 {
        &self.spec
    }

    pub fn into_spec(self) -> OrthographySpecV1 {
        self.spec
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[PatternVariableV1] {
        &self.spec.variables
    }

    pub fn get(&self, name: &str) -> Option<&PatternVariableV1> {
        self.index.get(name).map(|&i| &self.spec.variables[i])
    }

    pub fn body(&self, name: &str) -> Option<&PatternExprV1> {
        self.get(name).map(|v| &v.body)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declaration index of a variable.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn keys(&self) -> &[Name] {
        &self.spec.keys
    }

    pub fn entry_points(&self) -> &[EntryPointV1] {
        &self.spec.entry_points
    }

    pub fn separator(&self) -> char {
        self.spec.separator
    }
}
