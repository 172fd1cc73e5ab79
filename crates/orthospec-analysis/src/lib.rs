//! Structural analysis of orthography pattern graphs
//!
//! Given a checked [`PatternGraph`], [`analyze`] computes for every variable
//! how many field separators it contributes, checks that inline unions agree on
//! that number, and maps each entry point's top-level components onto the
//! ordered feature keys. Problems are reported as [`Diagnostic`]s next to a
//! best-effort result; only loading and graph construction are fatal.

use std::collections::HashSet;

use orthospec_dsl::digest::spec_digest_v1;
use orthospec_dsl::{GraphBuildError, PatternExprV1, PatternGraph, SpecV1ParseError};
use thiserror::Error;
use tracing::info;

pub mod cache;
pub mod counter;
pub mod diagnostics;
pub mod field_map;
pub mod report;
pub mod result;

pub use cache::AnalysisCache;
pub use counter::SeparatorCounter;
pub use diagnostics::{Diagnostic, DiagnosticKind, MismatchDetail, Severity};
pub use field_map::FieldMapper;
pub use report::{render_report_json, render_report_text};
pub use result::{
    AnalysisResult, ComponentMapping, EntryPointReport, FieldMapping, ItemMapping, Policy,
    RejectedSpec, SeparatorCount, SliceStatus, VariableSummary,
};

/// Failures that stop analysis before it starts.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error(transparent)]
    Parse(#[from] SpecV1ParseError),
    #[error(transparent)]
    Graph(#[from] GraphBuildError),
}

/// Analyze a graph. Pure: the same graph always yields an equal result.
pub fn analyze(graph: &PatternGraph) -> AnalysisResult {
    let mut counter = SeparatorCounter::new(graph);
    counter.resolve_all();

    let variables: Vec<VariableSummary> = graph
        .variables()
        .iter()
        .map(|v| VariableSummary {
            name: v.name.clone(),
            counts: counter.counts(&v.name),
            references: distinct_references(&v.body),
        })
        .collect();

    let mut diagnostics = counter.take_diagnostics();
    diagnostics.extend(diagnostics::duplicate_key_diagnostics(graph.keys()));

    let mut mapper = FieldMapper::new(graph, &mut counter);
    let entry_points: Vec<EntryPointReport> = graph
        .entry_points()
        .iter()
        .map(|entry| mapper.map_entry(entry))
        .collect();
    let (field_mappings, mapping_diagnostics) = mapper.finish();
    diagnostics.extend(mapping_diagnostics);

    let mapped: HashSet<&str> = field_mappings.iter().map(|m| m.variable.as_str()).collect();
    let unmapped: Vec<String> = graph
        .variables()
        .iter()
        .filter(|v| !mapped.contains(v.name.as_str()))
        .map(|v| v.name.clone())
        .collect();

    let result = AnalysisResult {
        id: graph.spec().id.clone(),
        digest: spec_digest_v1(graph.spec()),
        keys: graph.keys().to_vec(),
        variables,
        entry_points,
        field_mappings,
        unmapped,
        diagnostics,
    };
    info!(
        digest = %result.digest,
        variables = result.variables.len(),
        errors = result.error_count(),
        warnings = result.warning_count(),
        "analysis complete"
    );
    result
}

fn distinct_references(body: &PatternExprV1) -> Vec<String> {
    let mut seen = HashSet::new();
    body.references()
        .into_iter()
        .filter(|r| seen.insert(*r))
        .map(str::to_string)
        .collect()
}

/// Load a `spec_v1` JSON document, build its graph and analyze it.
pub fn analyze_text(text: &str) -> Result<AnalysisResult, SpecError> {
    let spec = orthospec_dsl::parse_spec_v1(text)?;
    let graph = PatternGraph::build(spec)?;
    Ok(analyze(&graph))
}
