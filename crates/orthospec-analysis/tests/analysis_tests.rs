use orthospec_analysis::{
    analyze, analyze_text, render_report_json, render_report_text, DiagnosticKind,
    MismatchDetail, Policy, SeparatorCount, Severity, SliceStatus, SpecError,
};
use orthospec_dsl::spec_v1::{EntryRole, OrthographySpecV1, PatternExprV1 as E};
use orthospec_dsl::{GraphBuildError, PatternGraph};

fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("f{i}")).collect()
}

fn build(spec: OrthographySpecV1) -> PatternGraph {
    PatternGraph::build(spec).expect("graph builds")
}

fn strs(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn x_two_fields() -> E {
    E::concat(vec![E::literal("a"), E::Separator, E::literal("b")])
}

fn y_three_fields() -> E {
    E::concat(vec![
        E::literal("c"),
        E::Separator,
        E::literal("d"),
        E::Separator,
        E::literal("e"),
    ])
}

#[test]
fn literal_with_k_markers_counts_k() {
    let g = build(
        OrthographySpecV1::new(keys(3))
            .with_variable("Lit", E::literal("a*b*c"))
            .with_entry(EntryRole::Parse, "Lit"),
    );
    let r = analyze(&g);
    assert_eq!(r.count("Lit"), Some(SeparatorCount { direct: 2, total: 2 }));
    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
}

#[test]
fn inline_slot_is_attributed_to_the_entry_point() {
    let g = build(
        OrthographySpecV1::new(keys(5))
            .with_variable("X", x_two_fields())
            .with_variable(
                "Entry",
                E::concat(vec![E::reference("X"), E::Separator, y_three_fields()]),
            )
            .with_entry(EntryRole::Parse, "Entry"),
    );
    let r = analyze(&g);

    assert_eq!(r.count("Entry").map(|c| c.total), Some(4));
    assert_eq!(r.diagnostics_with_code("entry_point_separator_mismatch").count(), 0);
    assert_eq!(r.mapping("X").map(|m| m.keys.clone()), Some(strs(&["f0", "f1"])));
    assert_eq!(r.mapping("Entry").map(|m| m.keys.clone()), Some(keys(5)));

    let parse = r.entry(EntryRole::Parse).expect("parse entry");
    assert!(parse.is_consistent());
    let slot = &parse.components[1].items[0];
    assert_eq!(slot.variable, None);
    assert_eq!(slot.keys, strs(&["f2", "f3", "f4"]));
    assert!(r.unmapped.is_empty());
}

#[test]
fn referenced_slot_is_attributed_to_the_variable() {
    let g = build(
        OrthographySpecV1::new(keys(5))
            .with_variable("X", x_two_fields())
            .with_variable("Y", y_three_fields())
            .with_variable(
                "Entry",
                E::concat(vec![E::reference("X"), E::Separator, E::reference("Y")]),
            )
            .with_entry(EntryRole::Parse, "Entry"),
    );
    let r = analyze(&g);

    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    assert_eq!(r.mapping("X").map(|m| m.keys.clone()), Some(strs(&["f0", "f1"])));
    let y = r.mapping("Y").expect("Y mapped");
    assert_eq!(y.start, 2);
    assert_eq!(y.keys, strs(&["f2", "f3", "f4"]));
    assert_eq!(y.role, EntryRole::Parse);
}

#[test]
fn adjacent_items_share_the_junction_key() {
    // Initial (GradeVowel Coda) Tone: GradeVowel and Coda meet on one key.
    let g = build(
        OrthographySpecV1::new(strs(&["initial", "grade", "rounded", "rhyme", "tone"]))
            .with_variable("Initial", E::literal("p"))
            .with_variable(
                "GradeVowel",
                E::concat(vec![E::paired("i", "3"), E::Separator, E::paired("", "0"), E::Separator]),
            )
            .with_variable("Coda", E::paired("ng", "geng"))
            .with_variable("Tone", E::literal("1"))
            .with_variable(
                "Syllable",
                E::concat(vec![
                    E::reference("Initial"),
                    E::Separator,
                    E::reference("GradeVowel"),
                    E::reference("Coda"),
                    E::Separator,
                    E::reference("Tone"),
                ]),
            )
            .with_entry(EntryRole::Parse, "Syllable"),
    );
    let r = analyze(&g);

    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    assert_eq!(r.mapping("GradeVowel").map(|m| m.keys.clone()), Some(strs(&["grade", "rounded", "rhyme"])));
    assert_eq!(r.mapping("Coda").map(|m| m.keys.clone()), Some(strs(&["rhyme"])));
    assert_eq!(r.mapping("Tone").map(|m| m.keys.clone()), Some(strs(&["tone"])));
}

#[test]
fn consistent_union_reports_nothing() {
    let g = build(
        OrthographySpecV1::new(keys(2))
            .with_variable("U", E::union(vec![E::literal("a*b"), E::Separator, x_two_fields()]))
            .with_entry(EntryRole::Parse, "U"),
    );
    let r = analyze(&g);
    assert_eq!(r.count("U").map(|c| c.total), Some(1));
    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
}

#[test]
fn inconsistent_union_uses_first_branch() {
    let g = build(
        OrthographySpecV1::new(keys(3))
            .with_variable(
                "U",
                E::union(vec![E::concat(vec![E::Separator, E::Separator]), E::Separator]),
            )
            .with_entry(EntryRole::Parse, "U"),
    );
    let r = analyze(&g);

    assert_eq!(r.count("U").map(|c| c.total), Some(2));
    let found: Vec<_> = r.diagnostics_with_code("inconsistent_union_branches").collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].variable.as_deref(), Some("U"));
    assert_eq!(
        found[0].kind,
        DiagnosticKind::InconsistentUnionBranches {
            branch_counts: vec![2, 1]
        }
    );
}

#[test]
fn mutual_cycle_flags_both_and_terminates() {
    let g = build(
        OrthographySpecV1::new(keys(1))
            .with_variable("A", E::reference("B"))
            .with_variable("B", E::reference("A"))
            .with_entry(EntryRole::Parse, "A"),
    );
    let r = analyze(&g);

    assert_eq!(r.count("A").map(|c| c.total), Some(0));
    assert_eq!(r.count("B").map(|c| c.total), Some(0));
    let flagged: Vec<_> = r
        .diagnostics_with_code("cyclic_reference")
        .map(|d| d.variable.clone().unwrap_or_default())
        .collect();
    assert_eq!(flagged, strs(&["A", "B"]));
    assert_eq!(r.diagnostics[0].severity, Severity::Error);
    assert!(r.has_errors());
    assert!(r.accept(Policy::Lenient).is_err());
}

#[test]
fn nested_helper_is_unmapped_but_counted() {
    let g = build(
        OrthographySpecV1::new(keys(3))
            .with_variable("Helper", x_two_fields())
            .with_variable("Mid", E::concat(vec![E::reference("Helper"), E::literal("m")]))
            .with_variable(
                "Syllable",
                E::concat(vec![E::reference("Mid"), E::Separator, E::literal("z")]),
            )
            .with_entry(EntryRole::Parse, "Syllable"),
    );
    let r = analyze(&g);

    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    assert_eq!(r.count("Helper"), Some(SeparatorCount { direct: 1, total: 1 }));
    assert_eq!(r.count("Mid"), Some(SeparatorCount { direct: 0, total: 1 }));
    assert_eq!(r.mapping("Mid").map(|m| m.keys.clone()), Some(strs(&["f0", "f1"])));
    assert!(r.mapping("Helper").is_none());
    assert_eq!(r.unmapped, strs(&["Helper"]));
}

#[test]
fn total_is_never_below_direct() {
    let g = build(
        OrthographySpecV1::new(keys(4))
            .with_variable("X", x_two_fields())
            .with_variable(
                "S",
                E::concat(vec![
                    E::reference("X"),
                    E::Separator,
                    E::union(vec![E::reference("X"), E::literal("q*r")]),
                ]),
            )
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);
    for v in &r.variables {
        assert!(v.counts.total >= v.counts.direct, "{v:?}");
    }
    assert_eq!(r.count("S"), Some(SeparatorCount { direct: 1, total: 3 }));
    assert_eq!(r.variables[1].references, strs(&["X"]));
}

#[test]
fn underflow_lists_unassigned_keys() {
    let g = build(
        OrthographySpecV1::new(keys(4))
            .with_variable("S", E::concat(vec![E::literal("a"), E::Separator, E::literal("b")]))
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);
    let details: Vec<_> = r
        .diagnostics
        .iter()
        .filter_map(|d| match &d.kind {
            DiagnosticKind::EntryPointSeparatorMismatch {
                expected, actual, detail, ..
            } => Some((*expected, *actual, detail.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        details,
        vec![
            (Some(3), 1, MismatchDetail::Count),
            (
                Some(3),
                1,
                MismatchDetail::Underflow {
                    unassigned_keys: strs(&["f2", "f3"])
                }
            ),
        ]
    );
    let parse = r.entry(EntryRole::Parse).expect("parse entry");
    assert_eq!(parse.unassigned_keys, strs(&["f2", "f3"]));
    assert!(!parse.is_consistent());
}

#[test]
fn overflow_lists_components_past_the_last_key() {
    let g = build(
        OrthographySpecV1::new(keys(2))
            .with_variable(
                "S",
                E::concat(vec![
                    E::literal("a"),
                    E::Separator,
                    E::literal("b"),
                    E::Separator,
                    E::literal("c"),
                ]),
            )
            .with_entry(EntryRole::Generate, "S"),
    );
    let r = analyze(&g);
    let generate = r.entry(EntryRole::Generate).expect("generate entry");
    assert_eq!(generate.components[2].status, SliceStatus::Overflow);
    assert!(generate.components[2].keys.is_empty());

    let overflow = r.diagnostics.iter().find(|d| {
        matches!(
            &d.kind,
            DiagnosticKind::EntryPointSeparatorMismatch {
                detail: MismatchDetail::Overflow { .. },
                ..
            }
        )
    });
    let Some(d) = overflow else {
        panic!("expected an overflow diagnostic: {:?}", r.diagnostics);
    };
    assert_eq!(
        d.kind,
        DiagnosticKind::EntryPointSeparatorMismatch {
            role: EntryRole::Generate,
            expected: Some(1),
            actual: 2,
            detail: MismatchDetail::Overflow {
                unmapped_components: strs(&["\"c\""])
            },
        }
    );
}

fn mismatch_details(
    r: &orthospec_analysis::AnalysisResult,
) -> Vec<(Option<usize>, usize, MismatchDetail)> {
    r.diagnostics
        .iter()
        .filter_map(|d| match &d.kind {
            DiagnosticKind::EntryPointSeparatorMismatch {
                expected, actual, detail, ..
            } => Some((*expected, *actual, detail.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn overflow_truncates_partially_fitting_component() {
    let g = build(
        OrthographySpecV1::new(keys(2))
            .with_variable(
                "X",
                E::concat(vec![
                    E::literal("a"),
                    E::Separator,
                    E::literal("b"),
                    E::Separator,
                    E::literal("c"),
                    E::Separator,
                    E::literal("d"),
                ]),
            )
            .with_variable("S", E::concat(vec![E::reference("X")]))
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);

    let parse = r.entry(EntryRole::Parse).expect("parse entry");
    assert_eq!(parse.components.len(), 1);
    let component = &parse.components[0];
    assert_eq!(component.status, SliceStatus::Truncated);
    assert_eq!(component.separators, 3);
    assert_eq!(component.keys, strs(&["f0", "f1"]));
    assert_eq!(component.items[0].keys, strs(&["f0", "f1"]));

    assert_eq!(r.mapping("X"), None);
    assert!(r.is_unmapped("X"));
    assert_eq!(r.mapping("S").map(|m| m.keys.clone()), Some(strs(&["f0", "f1"])));

    assert_eq!(
        mismatch_details(&r),
        vec![
            (Some(1), 3, MismatchDetail::Count),
            (
                Some(1),
                3,
                MismatchDetail::Overflow {
                    unmapped_components: strs(&["X"])
                }
            ),
        ]
    );
    assert!(render_report_text(&r).contains("[truncated]"));
}

#[test]
fn empty_key_list_always_reports_a_count_mismatch() {
    let g = build(
        OrthographySpecV1::new(Vec::<String>::new())
            .with_variable("S", E::literal("a"))
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);

    let parse = r.entry(EntryRole::Parse).expect("parse entry");
    assert_eq!(parse.expected, None);
    assert_eq!(parse.actual, 0);
    assert!(!parse.is_consistent());
    assert_eq!(parse.components[0].status, SliceStatus::Overflow);

    let details = mismatch_details(&r);
    assert_eq!(details[0], (None, 0, MismatchDetail::Count));
    assert!(matches!(details[1].2, MismatchDetail::Overflow { .. }));

    let text = r.diagnostics[0].to_string();
    assert!(text.contains("no feature keys are declared"), "{text}");
    assert!(!text.contains("expected 0"), "{text}");
}

#[test]
fn labels_use_a_custom_separator() {
    let text = r#"{
        "separator": "|",
        "fst": {
            "X": { "concat": ["a", "|", "b"] },
            "S": { "concat": [{ "concat": ["X", "|", "c"] }, "|", "d"] }
        },
        "keys": ["k0", "k1", "k2", "k3"],
        "parse": "S"
    }"#;
    let r = analyze_text(text).expect("analyzes");
    let parse = r.entry(EntryRole::Parse).expect("parse entry");
    assert_eq!(parse.components[0].label, r#"(X | "c")"#);
    assert!(parse.is_consistent(), "{parse:?}");
}

#[test]
fn conflicting_mappings_keep_the_first() {
    let g = build(
        OrthographySpecV1::new(keys(2))
            .with_variable("X", E::literal("x"))
            .with_variable("P", E::concat(vec![E::reference("X"), E::Separator, E::literal("b")]))
            .with_variable("G", E::concat(vec![E::literal("a"), E::Separator, E::reference("X")]))
            .with_entry(EntryRole::Parse, "P")
            .with_entry(EntryRole::Generate, "G"),
    );
    let r = analyze(&g);

    assert_eq!(r.mapping("X").map(|m| m.keys.clone()), Some(strs(&["f0"])));
    let conflicts: Vec<_> = r.diagnostics_with_code("conflicting_field_mapping").collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].kind,
        DiagnosticKind::ConflictingFieldMapping {
            role: EntryRole::Generate,
            kept: strs(&["f0"]),
            rejected: strs(&["f1"]),
        }
    );
    assert!(r.accept(Policy::Lenient).is_ok());
    assert!(r.accept(Policy::Strict).is_err());
}

#[test]
fn shared_entry_variable_maps_once() {
    let g = build(
        OrthographySpecV1::new(keys(5))
            .with_variable("X", x_two_fields())
            .with_variable("Y", y_three_fields())
            .with_variable(
                "S",
                E::concat(vec![E::reference("X"), E::Separator, E::reference("Y")]),
            )
            .with_entry(EntryRole::Parse, "S")
            .with_entry(EntryRole::Generate, "S"),
    );
    let r = analyze(&g);
    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    assert_eq!(r.entry_points.len(), 2);
    assert_eq!(r.field_mappings.len(), 3);
}

#[test]
fn duplicate_keys_warn() {
    let g = build(
        OrthographySpecV1::new(strs(&["a", "b", "a"]))
            .with_variable("S", E::literal("x*y*z"))
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);
    assert_eq!(r.diagnostics.len(), 1);
    assert_eq!(
        r.diagnostics[0].kind,
        DiagnosticKind::DuplicateFeatureKey {
            key: "a".to_string(),
            positions: vec![0, 2],
        }
    );
}

#[test]
fn diagnostics_are_ordered_counting_then_keys_then_mapping() {
    let g = build(
        OrthographySpecV1::new(strs(&["k", "k", "j"]))
            .with_variable("U", E::union(vec![E::Separator, E::literal("u")]))
            .with_variable("S", E::reference("U"))
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);
    let codes: Vec<_> = r.diagnostics.iter().map(|d| d.code()).collect();
    assert_eq!(
        codes,
        vec![
            "inconsistent_union_branches",
            "duplicate_feature_key",
            "entry_point_separator_mismatch",
            "entry_point_separator_mismatch",
        ]
    );
}

#[test]
fn analysis_is_idempotent() {
    let g = build(
        OrthographySpecV1::new(keys(2))
            .with_variable("A", E::concat(vec![E::reference("B"), E::Separator]))
            .with_variable("B", E::union(vec![E::reference("A"), E::Separator]))
            .with_entry(EntryRole::Parse, "A"),
    );
    let first = analyze(&g);
    let second = analyze(&g);
    assert_eq!(first, second);
    assert_eq!(
        render_report_json(&first).expect("json"),
        render_report_json(&second).expect("json")
    );
}

#[test]
fn analyze_text_surfaces_fatal_errors() {
    let dangling = r#"{"fst": {"S": {"concat": ["a", "*", {"ref": "Nope"}]}}, "keys": ["x", "y"], "parse": "S"}"#;
    match analyze_text(dangling) {
        Err(SpecError::Graph(GraphBuildError::UndefinedVariable { reference, container })) => {
            assert_eq!(reference, "Nope");
            assert_eq!(container, "S");
        }
        other => panic!("unexpected: {other:?}"),
    }

    let missing_entry = r#"{"fst": {"S": "a"}, "keys": ["x"], "generate": "Gen"}"#;
    assert!(matches!(
        analyze_text(missing_entry),
        Err(SpecError::Graph(GraphBuildError::UndefinedEntryPoint { .. }))
    ));

    assert!(matches!(analyze_text("{not json"), Err(SpecError::Parse(_))));
}

#[test]
fn analyze_text_reads_the_mini_language() {
    let text = r#"{
        "id": "tiny",
        "fst": {
            "Initial": {"union": ["p:p", "t:t"]},
            "Tone": {"union": ["1:1", "2:2"]},
            "Syllable": {"concat": ["Initial", "*", "a", "Tone"]}
        },
        "keys": ["initial", "tone"],
        "parse": "Syllable"
    }"#;
    let r = analyze_text(text).expect("analyzes");
    assert_eq!(r.id.as_deref(), Some("tiny"));
    assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    assert_eq!(r.mapping("Tone").map(|m| m.keys.clone()), Some(strs(&["tone"])));
    assert!(r.digest.starts_with("fnv1a64:"));
}

#[test]
fn text_report_has_every_section() {
    let g = build(
        OrthographySpecV1::new(keys(3))
            .with_variable("Helper", E::Separator)
            .with_variable("Mid", E::concat(vec![E::reference("Helper")]))
            .with_variable("S", E::concat(vec![E::reference("Mid"), E::literal("x")]))
            .with_entry(EntryRole::Parse, "S"),
    );
    let r = analyze(&g);
    let text = render_report_text(&r);
    for section in ["orthospec report", "entry points", "keys", "variables", "unmapped", "diagnostics"] {
        assert!(text.contains(section), "missing `{section}` in:\n{text}");
    }
    assert!(text.contains("parse `S`: expected 2, actual 1 (MISMATCH)"), "{text}");
    assert!(text.contains("  - Helper"), "{text}");
    assert!(text.contains("warning"), "{text}");
}
