use std::fs;

use codegen_cli::{build_cli, run_enum_info, run_replace};
use codegen_core::{CollectingSink, DiagnosticSink, MessageKind};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<GenerationConfig>
    <ReplaceMacro>
        <replace name="lives" value="3"/>
    </ReplaceMacro>
</GenerationConfig>
"#;

fn path_str(path: &std::path::Path) -> String {
    path.to_str().unwrap().to_string()
}

#[test]
fn test_replace_success() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("Game.cpp");
    let generated = dir.path().join("Game_generated.cpp");
    fs::write(&source, "int lives = CLN2D_GEN_REPLACE_INT(lives);\n").unwrap();
    fs::write(dir.path().join("Game.gen.xml"), CONFIG).unwrap();

    let mut sink = CollectingSink::new();
    let ok = run_replace(&path_str(&source), &path_str(&generated), "utf-8", true, &mut sink);

    assert!(ok);
    assert_eq!(fs::read_to_string(&generated).unwrap(), "int lives = 3;\n");
    assert_eq!(sink.error_count(), 0);
}

#[test]
fn test_replace_reports_errors_against_files() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("Game.cpp");
    let generated = dir.path().join("Game_generated.cpp");
    let config = dir.path().join("Game.gen.xml");
    fs::write(&source, "int lives = 1;\n").unwrap();
    fs::write(&config, "<Settings><ReplaceMacro/></Settings>").unwrap();

    let mut sink = CollectingSink::new();
    let ok = run_replace(&path_str(&source), &path_str(&generated), "utf-8", true, &mut sink);

    assert!(!ok);
    let errors: Vec<_> = sink.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].file, config.display().to_string());
    assert_eq!(errors[0].line, 0);
    assert_eq!(
        errors[0].message,
        "Root node is not 'GenerationConfig', found 'Settings' instead."
    );
}

#[test]
fn test_missing_source() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("Absent.cpp");
    let generated = dir.path().join("Absent_generated.cpp");

    let mut sink = CollectingSink::new();
    assert!(!run_replace(&path_str(&source), &path_str(&generated), "utf-8", true, &mut sink));
    assert_eq!(sink.errors().next().unwrap().file, source.display().to_string());
}

#[test]
fn test_unknown_encoding() {
    let mut sink = CollectingSink::new();
    assert!(!run_replace("a.cpp", "b.cpp", "klingon", true, &mut sink));
    assert_eq!(
        sink.errors().next().unwrap().message,
        "unknown encoding: klingon"
    );
}

#[test]
fn test_enum_info_command() {
    let dir = TempDir::new().unwrap();
    let header = dir.path().join("Color.h");
    let generated = dir.path().join("Color_enum_info.cpp");
    fs::write(&header, "DEFINE_ENUM()\nenum class EColor { Red, Green };\n").unwrap();

    let mut sink = CollectingSink::new();
    assert!(run_enum_info(&path_str(&header), &path_str(&generated), "utf-8", &mut sink));

    let output = fs::read_to_string(&generated).unwrap();
    assert!(output.starts_with("#include \"Color.h\"\n\n"));
    assert!(output.contains("    EColor::Green,\n"));
    assert_eq!(sink.diagnostics()[0].kind, MessageKind::Note);
}

#[test]
fn test_positional_encoding_argument() {
    let matches = build_cli()
        .try_get_matches_from(["cln2d-codegen", "replace", "a.cpp", "b.cpp", "utf-8-sig"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    assert_eq!(
        sub.get_one::<String>("encoding").map(String::as_str),
        Some("utf-8-sig")
    );
}
