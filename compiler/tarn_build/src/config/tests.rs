use super::*;
use pretty_assertions::assert_eq;

#[test]
fn defaults() {
    let config = BuildConfig::default();
    assert_eq!(config.output_dir, "build");
    assert_eq!(config.threading, Threading::Background);
    assert_eq!(config.stage_delay, Duration::ZERO);
    assert!(config.scanners.contains("tarn"));
    assert!(config.scanners.contains("txt"));
    assert!(!config.scanners.contains("md"));
}

#[test]
fn builders_override_fields() {
    let config = BuildConfig::default()
        .with_project_name("demo")
        .with_output_dir("out/")
        .with_threading(Threading::Inline)
        .with_stage_delay(Duration::from_millis(5))
        .with_full_recompile(true)
        .with_fail_fast(true)
        .with_no_compiler_checks(true)
        .with_scanners(ScannerRegistry::new());
    assert_eq!(config.project_name, "demo");
    assert_eq!(config.threading, Threading::Inline);
    assert!(config.full_recompile && config.fail_fast && config.no_compiler_checks);
    assert!(!config.scanners.contains("tarn"));
    assert_eq!(config.output_path("header.json"), "out/header.json");
}

#[test]
fn output_path_without_directory() {
    let config = BuildConfig::default().with_output_dir("");
    assert_eq!(config.output_path("code.txt"), "code.txt");
}
