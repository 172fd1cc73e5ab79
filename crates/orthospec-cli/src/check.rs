//! `orthospec check` subcommands.
//!
//! Each command loads a `spec_v1` document, builds the pattern graph and
//! prints a summary, the analysis diagnostics, or the full report.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use orthospec_analysis::{analyze, render_report_text, AnalysisResult, Policy, Severity};
use orthospec_dsl::digest::spec_digest_v1;
use orthospec_dsl::{parse_spec_v1, PatternGraph};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn load_graph(input: &Path) -> Result<PatternGraph> {
    let text =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let spec = parse_spec_v1(&text).with_context(|| format!("failed to load {}", input.display()))?;
    let graph = PatternGraph::build(spec)
        .with_context(|| format!("invalid pattern graph in {}", input.display()))?;
    debug!(
        path = %input.display(),
        variables = graph.variables().len(),
        keys = graph.keys().len(),
        "loaded specification"
    );
    Ok(graph)
}

fn policy(strict: bool) -> Policy {
    if strict {
        Policy::Strict
    } else {
        Policy::Lenient
    }
}

pub fn cmd_parse(input: &Path) -> Result<()> {
    println!("{} {}", "Parsing".green().bold(), input.display());

    let graph = load_graph(input)?;
    let spec = graph.spec();

    if let Some(id) = &spec.id {
        println!("  Id: {}", id.cyan());
    }
    println!("  Variables: {}", spec.variables.len());
    println!("  Keys: {}", spec.keys.len());
    for entry in &spec.entry_points {
        println!("  Entry {}: {}", entry.role, entry.variable.yellow());
    }
    println!("  Digest: {}", spec_digest_v1(spec));

    println!("{}", "Parsed.".green());
    Ok(())
}

pub fn cmd_validate(input: &Path, strict: bool) -> Result<()> {
    println!("{} {}", "Validating".green().bold(), input.display());

    let graph = load_graph(input)?;
    let result = analyze(&graph);

    for entry in &result.entry_points {
        let status = if entry.is_consistent() {
            "ok".green()
        } else {
            "mismatch".yellow()
        };
        let expected = entry
            .expected
            .map(|n| n.to_string())
            .unwrap_or_else(|| "no keys".to_string());
        println!(
            "  {} `{}`: {} separator(s), {expected} expected ({status})",
            entry.role,
            entry.variable.cyan(),
            entry.actual
        );
    }
    print_diagnostics(&result);

    result.accept(policy(strict))?;
    println!("{}", "Valid.".green());
    Ok(())
}

pub fn cmd_report(
    input: &Path,
    out: Option<&PathBuf>,
    format: &str,
    strict: bool,
    no_fail: bool,
) -> Result<()> {
    let format = format.trim().to_ascii_lowercase();
    if !matches!(format.as_str(), "json" | "text") {
        return Err(anyhow!("unknown --format `{format}` (expected json|text)"));
    }

    let graph = load_graph(input)?;
    let result = analyze(&graph);

    let rendered = match format.as_str() {
        "json" => orthospec_analysis::render_report_json(&result)?,
        _ => render_report_text(&result),
    };

    match out {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => {
            println!("{rendered}");
        }
    }

    if let Err(rejected) = result.accept(policy(strict)) {
        if !no_fail {
            return Err(rejected.into());
        }
    }
    Ok(())
}

fn print_diagnostics(result: &AnalysisResult) {
    for d in &result.diagnostics {
        let label = match d.severity {
            Severity::Error => d.severity.to_string().red().bold(),
            Severity::Warning => d.severity.to_string().yellow(),
        };
        let var = d
            .variable
            .as_deref()
            .map(|v| format!(" `{v}`"))
            .unwrap_or_default();
        println!("  {label}[{}]{var}: {}", d.code(), d.kind);
    }
}
