//! Human and machine renderings of an [`AnalysisResult`].
//!
//! Rendering only reads the result; nothing here recomputes counts.

use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostic, Severity};
use crate::result::{AnalysisResult, EntryPointReport, SliceStatus, VariableSummary};

pub fn render_report_json(r: &AnalysisResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(r)
}

pub fn render_report_text(r: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str("orthospec report\n");
    if let Some(id) = &r.id {
        out.push_str(&format!("  id: {id}\n"));
    }
    out.push_str(&format!("  digest: {}\n", r.digest));
    out.push_str(&format!(
        "  summary: variables={} keys={} entry_points={} errors={} warnings={} unmapped={}\n",
        r.variables.len(),
        r.keys.len(),
        r.entry_points.len(),
        r.error_count(),
        r.warning_count(),
        r.unmapped.len()
    ));

    out.push_str("\nentry points\n");
    for entry in &r.entry_points {
        render_entry(&mut out, entry);
    }

    out.push_str("\nkeys\n");
    for (i, key) in r.keys.iter().enumerate() {
        out.push_str(&format!("  {i:>3}  {key}\n"));
    }

    out.push_str("\nvariables\n");
    for var in &r.variables {
        render_variable(&mut out, r, var, "  ");
        for child in &var.references {
            match r.variables.iter().find(|v| &v.name == child) {
                Some(summary) => render_variable(&mut out, r, summary, "      "),
                None => out.push_str(&format!("      {child}  (undeclared)\n")),
            }
        }
    }

    out.push_str("\nunmapped\n");
    if r.unmapped.is_empty() {
        out.push_str("  (none)\n");
    }
    for name in &r.unmapped {
        out.push_str(&format!("  - {name}\n"));
    }

    out.push_str("\ndiagnostics\n");
    if r.diagnostics.is_empty() {
        out.push_str("  (no diagnostics)\n");
        return out;
    }

    let mut by_severity: BTreeMap<Severity, Vec<&Diagnostic>> = BTreeMap::new();
    for d in &r.diagnostics {
        by_severity.entry(d.severity).or_default().push(d);
    }
    for (severity, items) in by_severity {
        out.push_str(&format!("  {severity}\n"));
        for d in items {
            let var = d
                .variable
                .as_deref()
                .map(|v| format!(" `{v}`"))
                .unwrap_or_default();
            out.push_str(&format!("    - {}{}: {}\n", d.code(), var, d.kind));
        }
    }

    out
}

fn render_entry(out: &mut String, entry: &EntryPointReport) {
    let status = if entry.is_consistent() { "ok" } else { "MISMATCH" };
    let expected = entry
        .expected
        .map(|n| n.to_string())
        .unwrap_or_else(|| "- (no keys)".to_string());
    out.push_str(&format!(
        "  {} `{}`: expected {expected}, actual {} ({status})\n",
        entry.role, entry.variable, entry.actual
    ));
    for c in &entry.components {
        let mark = match c.status {
            SliceStatus::Complete => "",
            SliceStatus::Truncated => "  [truncated]",
            SliceStatus::Overflow => "  [overflow]",
        };
        out.push_str(&format!(
            "    [{}] {} -> {}{mark}\n",
            c.index,
            c.label,
            keys_or_dash(&c.keys)
        ));
    }
    if !entry.unassigned_keys.is_empty() {
        out.push_str(&format!(
            "    unassigned: {}\n",
            entry.unassigned_keys.join(", ")
        ));
    }
}

fn render_variable(out: &mut String, r: &AnalysisResult, var: &VariableSummary, indent: &str) {
    let features = r
        .mapping(&var.name)
        .map(|m| keys_or_dash(&m.keys))
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!(
        "{indent}{}  direct={} total={}  features=[{features}]\n",
        var.name, var.counts.direct, var.counts.total
    ));
}

fn keys_or_dash(keys: &[String]) -> String {
    if keys.is_empty() {
        "-".to_string()
    } else {
        keys.join(", ")
    }
}
