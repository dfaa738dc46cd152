use super::*;
use crate::frontend::Instruction;
use pretty_assertions::assert_eq;

#[test]
fn header_document_serializes_metadata() {
    let doc = HeaderDocument::new(
        ProjectInfo {
            name: "demo".into(),
            files: vec!["a.tarn".into()],
        },
        Vec::new(),
    );
    let lines = doc.to_lines().unwrap();
    assert_eq!(lines.first().map(String::as_str), Some("{"));
    let value: serde_json::Value = serde_json::from_str(&lines.join("\n")).unwrap();
    assert_eq!(value["compiler"], "tarn");
    assert_eq!(value["format_version"], HEADER_FORMAT_VERSION);
    assert_eq!(value["project"]["files"][0], "a.tarn");
    assert_eq!(value["compiler_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn code_lines_are_one_per_unit() {
    let artifacts = BuildArtifacts {
        report: Vec::new(),
        timings: PhaseTimings::default(),
        header: HeaderDocument::new(
            ProjectInfo {
                name: "demo".into(),
                files: Vec::new(),
            },
            Vec::new(),
        ),
        code: vec![CodeUnit {
            name: "m.f()".into(),
            site: None,
            instructions: vec![
                Instruction::new("fun m.f()", None),
                Instruction::new("ret ()", None),
            ],
        }],
    };
    assert_eq!(artifacts.code_lines(), vec!["m.f(): fun m.f() ; ret ()"]);
}

#[test]
fn report_lists_sections_and_truncates_messages() {
    let diagnostics = DiagnosticSummary {
        errors: 60,
        warnings: 1,
        messages: (0..60).map(|i| format!("a.tarn:{i}:1: bad")).collect(),
    };
    let report = build_report(
        "demo",
        &PhaseTimings::default(),
        &MemoryStats {
            files: 2,
            ..MemoryStats::default()
        },
        &diagnostics,
    );
    assert_eq!(report[0], "Build report for demo");
    assert!(report.iter().any(|l| l.trim_start().starts_with("total")));
    assert!(report.contains(&"  files   2".to_string()));
    assert!(report.contains(&"Diagnostics: 60 errors, 1 warnings (first 50 shown)".to_string()));
    assert_eq!(report.iter().filter(|l| l.ends_with(": bad")).count(), 50);
}

#[test]
fn report_times_every_phase() {
    let timings = PhaseTimings {
        load: Duration::from_millis(2),
        parse: Duration::from_millis(3),
        verify_code: Duration::from_millis(5),
        ..PhaseTimings::default()
    };
    assert_eq!(timings.total(), Duration::from_millis(10));
    let report = build_report(
        "demo",
        &timings,
        &MemoryStats::default(),
        &DiagnosticSummary::default(),
    );
    let line = |label: &str| {
        report
            .iter()
            .find(|l| l.trim_start().starts_with(label))
            .cloned()
            .unwrap()
    };
    assert!(line("load").ends_with("2.000 ms"));
    assert!(line("parse").ends_with("3.000 ms"));
    assert!(line("total").ends_with("10.000 ms"));
}
