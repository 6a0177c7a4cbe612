//! # Codegen Core
//!
//! Build-time source generation for CLN2D projects, including:
//! - Typed macro substitution (`CLN2D_GEN_REPLACE_<KIND>(name)` call sites
//!   filled from a `name.gen.xml` sidecar document)
//! - Detection of leftover or malformed call sites, with placeholder
//!   directives written back to the sidecar for the next run
//! - Enum lookup-table generation for `DEFINE_ENUM()` declarations
//!
//! Every run is a single stateless pass over one source/config pair.

#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod directive;
pub mod encoding;
pub mod enum_info;
pub mod extractor;
pub mod generator;
pub mod registry;
pub mod rewriter;
pub mod scanner;

use std::path::{Path, PathBuf};

// Re-export commonly used types
pub use config::{ConfigDocument, ConfigError, Element, Node};
pub use diagnostics::{
    CollectingSink, ConsoleSink, Diagnostic, DiagnosticSink, MessageFormat, MessageKind,
};
pub use directive::{Directive, DirectiveNode};
pub use encoding::{EncodingError, TextEncoding};
pub use enum_info::{EnumDecl, EnumInfoGenerator};
pub use extractor::{DirectiveExtractor, Extraction, SubstitutionOutcome};
pub use generator::{CodeGenerator, GenerationReport, Operation, OperationStats};
pub use registry::{MacroRegistry, MacroRegistryBuilder, MacroType, RegistryError};
pub use rewriter::rewrite_directives;
pub use scanner::{ResidualClassification, ResidualMacro, ResidualScan, ResidualScanner};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the code generator.
///
/// Log output goes to stderr; stdout is reserved for note diagnostics.
pub fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "codegen_core=info".parse() {
        filter = filter.add_directive(directive);
    }

    // A second initialisation (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Tag name the sidecar document's root element must carry
    pub root_tag: String,
    /// Extension that replaces the source extension to locate the sidecar
    pub config_extension: String,
    /// Prefix shared by every macro call site
    pub macro_prefix: String,
    /// Encoding used to read the source and write the generated file
    pub encoding: TextEncoding,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            root_tag: "GenerationConfig".to_string(),
            config_extension: "gen.xml".to_string(),
            macro_prefix: registry::DEFAULT_MACRO_PREFIX.to_string(),
            encoding: TextEncoding::utf8(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sidecar path for a source file: `dir/name.cpp` becomes `dir/name.gen.xml`.
    pub fn config_path_for(&self, source: impl AsRef<Path>) -> PathBuf {
        source.as_ref().with_extension(&self.config_extension)
    }
}

/// Error types for code generation runs
#[derive(thiserror::Error, Debug)]
pub enum CodegenError {
    /// Source file does not exist
    #[error("The source file '{}' does not exist.", .path.display())]
    SourceMissing { path: PathBuf },

    /// Source file could not be read or decoded
    #[error("Could not read source file '{}'. {message}", .path.display())]
    SourceUnreadable { path: PathBuf, message: String },

    /// Sidecar document could not be read or parsed
    #[error("Could not read XML file '{}'. {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Sidecar root element carries the wrong tag
    #[error("Root node is not '{expected}', found '{found}' instead.")]
    RootTagMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Sidecar root lacks one or more operation groups
    #[error("'{root}' does not have children: {}", .missing.join(", "))]
    MissingOperations {
        path: PathBuf,
        root: String,
        missing: Vec<String>,
    },

    /// Generated file could not be written
    #[error("Could not write to output file '{}'. {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sidecar document could not be written back
    #[error("Could not write XML file '{}'. {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Text encoding error
    #[error("{0}")]
    Encoding(#[from] EncodingError),
}

impl CodegenError {
    /// File the diagnostic for this error should be reported against.
    pub fn report_path(&self) -> Option<&Path> {
        match self {
            Self::SourceMissing { path }
            | Self::SourceUnreadable { path, .. }
            | Self::ConfigUnreadable { path, .. }
            | Self::RootTagMismatch { path, .. }
            | Self::MissingOperations { path, .. }
            | Self::OutputWrite { path, .. }
            | Self::ConfigWrite { path, .. } => Some(path),
            Self::Encoding(_) => None,
        }
    }

    /// Hard failures stop the run before the sidecar is written back.
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, Self::MissingOperations { .. })
    }
}

/// Result type for code generation operations
pub type Result<T> = std::result::Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_replaces_extension() {
        let config = GeneratorConfig::default();
        assert_eq!(
            config.config_path_for("src/Player.cpp"),
            PathBuf::from("src/Player.gen.xml")
        );
        assert_eq!(
            config.config_path_for("src/Makefile"),
            PathBuf::from("src/Makefile.gen.xml")
        );
    }

    #[test]
    fn test_missing_operations_message() {
        let err = CodegenError::MissingOperations {
            path: PathBuf::from("Player.gen.xml"),
            root: "GenerationConfig".to_string(),
            missing: vec!["ReplaceMacro".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "'GenerationConfig' does not have children: ReplaceMacro"
        );
        assert!(err.is_hard_failure());
        assert_eq!(err.report_path(), Some(Path::new("Player.gen.xml")));
    }
}
