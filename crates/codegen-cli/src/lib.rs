//! CLN2D code generation driver
//!
//! Argument handling and exit-status reporting around `codegen_core`. Build
//! systems call this once per generated file:
//!
//! ```text
//! cln2d-codegen replace   <SOURCE> <GENERATED> [ENCODING]
//! cln2d-codegen enum-info <SOURCE> <GENERATED> [ENCODING]
//! ```

use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use codegen_core::{
    CodeGenerator, ConsoleSink, Diagnostic, DiagnosticSink, EnumInfoGenerator, GeneratorConfig,
    MessageFormat, TextEncoding,
};
use tracing::info;

const TOOL: &str = "cln2d-codegen";

fn file_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .help("Source file to read")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("generated")
                .value_name("GENERATED")
                .help("Generated file to write")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("encoding")
                .value_name("ENCODING")
                .help("Text encoding of source and generated files")
                .default_value("utf-8")
                .index(3),
        )
}

/// Command-line definition
pub fn build_cli() -> Command {
    Command::new(TOOL)
        .version(codegen_core::VERSION)
        .about("Build-time code generation for CLN2D sources")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("message-format")
                .long("message-format")
                .value_name("FORMAT")
                .help("Diagnostic rendering")
                .value_parser(["human", "json"])
                .default_value("human")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Suppress the startup banner")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(file_args(
            Command::new("replace")
                .about("Replace CLN2D_GEN_REPLACE_* macros using the source's .gen.xml"),
        ))
        .subcommand(file_args(
            Command::new("enum-info").about("Generate EnumInfo tables for DEFINE_ENUM() enums"),
        ))
}

/// Execute parsed arguments, reporting through the console.
pub fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let format = match matches.get_one::<String>("message-format").map(String::as_str) {
        Some("json") => MessageFormat::Json,
        _ => MessageFormat::Human,
    };
    let mut sink = ConsoleSink::new(format);

    let succeeded = match matches.subcommand() {
        Some((name @ ("replace" | "enum-info"), sub)) => {
            let source = required(sub, "source")?;
            let generated = required(sub, "generated")?;
            let encoding = required(sub, "encoding")?;
            let quiet = sub.get_flag("quiet");
            if name == "replace" {
                run_replace(source, generated, encoding, quiet, &mut sink)
            } else {
                run_enum_info(source, generated, encoding, &mut sink)
            }
        }
        Some((other, _)) => return Err(anyhow!("unknown subcommand '{other}'")),
        None => return Err(anyhow!("no subcommand given")),
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument '{id}'"))
}

fn parse_encoding(
    source: &Path,
    label: &str,
    sink: &mut dyn DiagnosticSink,
) -> Option<TextEncoding> {
    match label.parse::<TextEncoding>() {
        Ok(encoding) => Some(encoding),
        Err(err) => {
            sink.emit(Diagnostic::error(source, 0, err.to_string()));
            None
        }
    }
}

/// Macro substitution for one source file. Returns whether it succeeded.
pub fn run_replace(
    source: &str,
    generated: &str,
    encoding: &str,
    quiet: bool,
    sink: &mut dyn DiagnosticSink,
) -> bool {
    let source = Path::new(source);
    let generated = Path::new(generated);
    let Some(encoding) = parse_encoding(source, encoding, sink) else {
        return false;
    };

    let generator = CodeGenerator::new(GeneratorConfig::default().with_encoding(encoding));
    let config_path = generator.config().config_path_for(source);
    if !quiet {
        println!(
            "[{TOOL}] Source='{}' Generated='{}' Encoding='{}' GenerationConfig='{}'",
            source.display(),
            generated.display(),
            encoding,
            config_path.display()
        );
    }

    match generator.generate(source, generated, sink) {
        Ok(report) if report.succeeded() => true,
        Ok(_) => {
            println!("[{TOOL}] Generation failed: {}", source.display());
            false
        }
        Err(err) => {
            if err.is_hard_failure() {
                info!("stopping before the generation config is rewritten");
            }
            let reported = err.report_path().unwrap_or(source);
            sink.emit(Diagnostic::error(reported, 0, err.to_string()));
            println!("[{TOOL}] Generation failed: {}", source.display());
            false
        }
    }
}

/// Enum table generation for one header. Returns whether it succeeded.
pub fn run_enum_info(
    source: &str,
    generated: &str,
    encoding: &str,
    sink: &mut dyn DiagnosticSink,
) -> bool {
    let source = Path::new(source);
    let generated = Path::new(generated);
    let Some(encoding) = parse_encoding(source, encoding, sink) else {
        return false;
    };

    match EnumInfoGenerator::new(encoding).generate(source, generated, sink) {
        Ok(_) => true,
        Err(err) => {
            let reported = err.report_path().unwrap_or(source);
            sink.emit(Diagnostic::error(reported, 0, err.to_string()));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_default_encoding() {
        let matches = build_cli()
            .try_get_matches_from([TOOL, "replace", "a.cpp", "a_generated.cpp"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "replace");
        assert_eq!(required(sub, "encoding").unwrap(), "utf-8");
        assert_eq!(
            matches.get_one::<String>("message-format").map(String::as_str),
            Some("human")
        );
    }

    #[test]
    fn test_missing_arguments_rejected() {
        assert!(build_cli()
            .try_get_matches_from([TOOL, "replace", "a.cpp"])
            .is_err());
        assert!(build_cli().try_get_matches_from([TOOL]).is_err());
    }

    #[test]
    fn test_message_format_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from([
                TOOL,
                "enum-info",
                "E.h",
                "E_generated.cpp",
                "--message-format",
                "json",
            ])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("message-format").map(String::as_str),
            Some("json")
        );
    }
}
