//! Separator counting with inline union consistency checks.
//!
//! `direct` counts stay inside one variable's body. `total` counts follow
//! references, memoized per variable for the lifetime of one counter, with an
//! in-progress stack so a variable reached while it is still being resolved
//! is reported as cyclic and contributes 0.
//!
//! Unions resolve to their first branch's count. Disagreeing branches are
//! reported against the variable whose body contains the union.

use std::collections::{HashMap, HashSet};

use orthospec_dsl::spec_v1::{LiteralV1, PatternExprV1};
use orthospec_dsl::PatternGraph;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::result::SeparatorCount;

pub struct SeparatorCounter<'g> {
    graph: &'g PatternGraph,
    memo: HashMap<&'g str, usize>,
    resolving: Vec<&'g str>,
    reported_cyclic: HashSet<&'g str>,
    diagnostics: Vec<Diagnostic>,
}

impl<'g> SeparatorCounter<'g> {
    pub fn new(graph: &'g PatternGraph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
            resolving: Vec::new(),
            reported_cyclic: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Resolve every variable in declaration order.
    ///
    /// Diagnostic order depends only on declaration order, so two runs over
    /// the same graph report identically.
    pub fn resolve_all(&mut self) {
        let graph = self.graph;
        for var in graph.variables() {
            self.total_count(&var.name);
        }
    }

    /// Separators written inline in `name`'s body. Unknown names count 0.
    pub fn direct_count(&self, name: &str) -> usize {
        self.graph
            .body(name)
            .map(|body| self.expr_direct(body))
            .unwrap_or(0)
    }

    /// Separators in `name` with every reference inlined.
    pub fn total_count(&mut self, name: &str) -> usize {
        let graph = self.graph;
        let Some(var) = graph.get(name) else {
            return 0;
        };
        let name = var.name.as_str();

        if let Some(&total) = self.memo.get(name) {
            return total;
        }

        if let Some(pos) = self.resolving.iter().position(|&n| n == name) {
            let cycle = self.resolving[pos..].to_vec();
            self.record_cycle(&cycle);
            return 0;
        }

        self.resolving.push(name);
        let total = self.expr_total(name, &var.body, true);
        self.resolving.pop();

        self.memo.insert(name, total);
        debug!(
            variable = name,
            direct = self.expr_direct(&var.body),
            total,
            "resolved separator count"
        );
        total
    }

    pub fn counts(&mut self, name: &str) -> SeparatorCount {
        SeparatorCount {
            direct: self.direct_count(name),
            total: self.total_count(name),
        }
    }

    /// Total count of an expression that is not a variable body of its own
    /// (e.g. an inline item of an entry point). Union disagreements inside it
    /// were already reported when its owner was resolved.
    pub fn inline_total(&mut self, expr: &'g PatternExprV1) -> usize {
        self.expr_total("", expr, false)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn literal_count(&self, text: &LiteralV1) -> usize {
        let sep = self.graph.separator();
        text.features().chars().filter(|&c| c == sep).count()
    }

    fn expr_direct(&self, expr: &PatternExprV1) -> usize {
        match expr {
            PatternExprV1::Literal { text } => self.literal_count(text),
            PatternExprV1::Separator => 1,
            PatternExprV1::Reference { .. } => 0,
            PatternExprV1::Concat { items } => items.iter().map(|e| self.expr_direct(e)).sum(),
            PatternExprV1::Union { branches } => branches
                .first()
                .map(|b| self.expr_direct(b))
                .unwrap_or(0),
        }
    }

    fn expr_total(&mut self, owner: &'g str, expr: &'g PatternExprV1, record: bool) -> usize {
        match expr {
            PatternExprV1::Literal { text } => self.literal_count(text),
            PatternExprV1::Separator => 1,
            PatternExprV1::Reference { name } => self.total_count(name),
            PatternExprV1::Concat { items } => items
                .iter()
                .map(|e| self.expr_total(owner, e, record))
                .sum(),
            PatternExprV1::Union { branches } => {
                let branch_counts: Vec<usize> = branches
                    .iter()
                    .map(|b| self.expr_total(owner, b, record))
                    .collect();
                let first = branch_counts.first().copied().unwrap_or(0);
                if record && branch_counts.iter().any(|&c| c != first) {
                    debug!(variable = owner, ?branch_counts, "union branches disagree");
                    self.diagnostics.push(Diagnostic::new(
                        Some(owner),
                        DiagnosticKind::InconsistentUnionBranches { branch_counts },
                    ));
                }
                first
            }
        }
    }

    fn record_cycle(&mut self, cycle: &[&'g str]) {
        let mut path: Vec<String> = cycle.iter().map(|s| s.to_string()).collect();
        if let Some(first) = cycle.first() {
            path.push(first.to_string());
        }
        for &member in cycle {
            if self.reported_cyclic.insert(member) {
                debug!(variable = member, cycle = %path.join(" -> "), "reference cycle");
                self.diagnostics.push(Diagnostic::new(
                    Some(member),
                    DiagnosticKind::CyclicReference {
                        cycle: path.clone(),
                    },
                ));
            }
        }
    }
}
