//! Entry-point field mapping.
//!
//! An entry point's top-level items are split at separator markers into
//! components. Walking the components left to right with a running key offset,
//! a component with `n` separators governs the next `n + 1` feature keys. Items
//! inside one component sit next to each other with no separator between
//! them, so neighbours share the key at their junction.
//!
//! A bare reference item hands its slice to the referenced variable; inline
//! items leave it with the entry variable.

use std::collections::HashMap;

use orthospec_dsl::spec_v1::{EntryPointV1, EntryRole, Name, PatternExprV1};
use orthospec_dsl::PatternGraph;
use tracing::debug;

use crate::counter::SeparatorCounter;
use crate::diagnostics::{Diagnostic, DiagnosticKind, MismatchDetail};
use crate::result::{ComponentMapping, EntryPointReport, FieldMapping, ItemMapping, SliceStatus};

pub struct FieldMapper<'a, 'g> {
    graph: &'g PatternGraph,
    counter: &'a mut SeparatorCounter<'g>,
    mappings: HashMap<&'g str, FieldMapping>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, 'g> FieldMapper<'a, 'g> {
    pub fn new(graph: &'g PatternGraph, counter: &'a mut SeparatorCounter<'g>) -> Self {
        Self {
            graph,
            counter,
            mappings: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn map_entry(&mut self, entry: &'g EntryPointV1) -> EntryPointReport {
        let graph = self.graph;
        let keys = graph.keys();
        let expected = keys.len().checked_sub(1);
        let actual = self.counter.total_count(&entry.variable);

        let mut report = EntryPointReport {
            role: entry.role,
            variable: entry.variable.clone(),
            expected,
            actual,
            components: vec![],
            unassigned_keys: vec![],
        };

        if expected != Some(actual) {
            self.mismatch(entry, expected, actual, MismatchDetail::Count);
        }

        let Some(var) = graph.get(&entry.variable) else {
            return report;
        };
        self.assign(entry.role, &var.name, 0, keys.to_vec());

        let mut pos = 0usize;
        let mut overflowed: Vec<String> = Vec::new();
        for (index, items) in components(top_level_items(&var.body)).into_iter().enumerate() {
            let component = self.map_component(entry.role, index, pos, &items);
            pos = component.start + component.separators + 1;
            if component.status != SliceStatus::Complete {
                overflowed.push(component.label.clone());
            }
            debug!(
                role = %entry.role,
                component = %component.label,
                start = component.start,
                keys = ?component.keys,
                "mapped component"
            );
            report.components.push(component);
        }

        if pos < keys.len() {
            report.unassigned_keys = keys[pos..].to_vec();
            self.mismatch(
                entry,
                expected,
                actual,
                MismatchDetail::Underflow {
                    unassigned_keys: report.unassigned_keys.clone(),
                },
            );
        } else if pos > keys.len() {
            self.mismatch(
                entry,
                expected,
                actual,
                MismatchDetail::Overflow {
                    unmapped_components: overflowed,
                },
            );
        }

        report
    }

    /// Mappings in variable declaration order, plus the diagnostics recorded
    /// while mapping.
    pub fn finish(self) -> (Vec<FieldMapping>, Vec<Diagnostic>) {
        let graph = self.graph;
        let mut mappings: Vec<FieldMapping> = self.mappings.into_values().collect();
        mappings.sort_by_key(|m| graph.position(&m.variable).unwrap_or(usize::MAX));
        (mappings, self.diagnostics)
    }

    fn map_component(
        &mut self,
        role: EntryRole,
        index: usize,
        start: usize,
        items: &[&'g PatternExprV1],
    ) -> ComponentMapping {
        let graph = self.graph;
        let keys = graph.keys();
        let separator = graph.spec().separator;
        let totals: Vec<usize> = items.iter().map(|&e| self.counter.inline_total(e)).collect();
        let separators: usize = totals.iter().sum();
        let end = start + separators + 1;

        let status = if end <= keys.len() {
            SliceStatus::Complete
        } else if start < keys.len() {
            SliceStatus::Truncated
        } else {
            SliceStatus::Overflow
        };

        let mut mapped_items = Vec::with_capacity(items.len());
        let mut item_start = start;
        for (&expr, &total) in items.iter().zip(&totals) {
            let item_end = item_start + total + 1;
            let variable = match expr {
                PatternExprV1::Reference { name } => Some(name),
                _ => None,
            };
            if let Some(name) = variable {
                if item_end <= keys.len() {
                    self.assign(role, name, item_start, keys[item_start..item_end].to_vec());
                }
            }
            mapped_items.push(ItemMapping {
                label: expr.display_with(separator).to_string(),
                variable: variable.cloned(),
                separators: total,
                start: item_start,
                keys: clamped(keys, item_start, item_end),
            });
            item_start += total;
        }

        ComponentMapping {
            index,
            label: component_label(items, separator),
            separators,
            start,
            keys: clamped(keys, start, end),
            status,
            items: mapped_items,
        }
    }

    fn assign(&mut self, role: EntryRole, variable: &'g str, start: usize, keys: Vec<Name>) {
        match self.mappings.get(variable) {
            None => {
                self.mappings.insert(
                    variable,
                    FieldMapping {
                        variable: variable.to_string(),
                        role,
                        start,
                        keys,
                    },
                );
            }
            Some(existing) if existing.start == start && existing.keys == keys => {}
            Some(existing) => {
                let kind = DiagnosticKind::ConflictingFieldMapping {
                    role,
                    kept: existing.keys.clone(),
                    rejected: keys,
                };
                self.diagnostics.push(Diagnostic::new(Some(variable), kind));
            }
        }
    }

    fn mismatch(
        &mut self,
        entry: &EntryPointV1,
        expected: Option<usize>,
        actual: usize,
        detail: MismatchDetail,
    ) {
        debug!(role = %entry.role, ?expected, actual, ?detail, "entry point mismatch");
        self.diagnostics.push(Diagnostic::new(
            Some(&entry.variable),
            DiagnosticKind::EntryPointSeparatorMismatch {
                role: entry.role,
                expected,
                actual,
                detail,
            },
        ));
    }
}

/// The sequence an entry point is decomposed from: a concat's items, the
/// first union branch's items, or the body itself.
fn top_level_items(body: &PatternExprV1) -> Vec<&PatternExprV1> {
    match body {
        PatternExprV1::Concat { items } => items.iter().collect(),
        PatternExprV1::Union { branches } => match branches.first() {
            Some(PatternExprV1::Concat { items }) => items.iter().collect(),
            Some(other) => vec![other],
            None => vec![],
        },
        PatternExprV1::Literal { .. }
        | PatternExprV1::Separator
        | PatternExprV1::Reference { .. } => vec![body],
    }
}

/// Split items at separator markers. `n` separators always give `n + 1`
/// components, some possibly empty.
fn components<'e>(items: Vec<&'e PatternExprV1>) -> Vec<Vec<&'e PatternExprV1>> {
    let mut out: Vec<Vec<&PatternExprV1>> = vec![vec![]];
    for item in items {
        match item {
            PatternExprV1::Separator => out.push(vec![]),
            _ => {
                if let Some(last) = out.last_mut() {
                    last.push(item);
                }
            }
        }
    }
    out
}

fn component_label(items: &[&PatternExprV1], separator: char) -> String {
    match items {
        [] => "(empty)".to_string(),
        [single] => single.display_with(separator).to_string(),
        many => many
            .iter()
            .map(|e| e.display_with(separator).to_string())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn clamped(keys: &[Name], start: usize, end: usize) -> Vec<Name> {
    let len = keys.len();
    keys[start.min(len)..end.min(len)].to_vec()
}
