/*!
# Code Generator

Runs one generation pass for a source file:

1. Read and decode the source.
2. Load `name.gen.xml`, check its root tag and that every operation group
   exists.
3. Apply each operation group found under the root, in document order.
4. Write the generated file if every operation succeeded.
5. Write the sidecar back, whatever the outcome, so pruned and placeholder
   directives are visible to the next run.
*/

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ConfigDocument, Element, Node};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::directive::DirectiveNode;
use crate::extractor::{DirectiveExtractor, SubstitutionOutcome};
use crate::registry::MacroRegistry;
use crate::rewriter::{rewrite_directives, write_group};
use crate::scanner::ResidualScanner;
use crate::{CodegenError, GeneratorConfig, Result};

/// Operation groups a sidecar document may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `<ReplaceMacro>`: typed macro substitution
    ReplaceMacro,
}

impl Operation {
    /// Every operation; each must have a group under the root.
    pub const ALL: [Operation; 1] = [Operation::ReplaceMacro];

    pub fn tag(&self) -> &'static str {
        match self {
            Operation::ReplaceMacro => "ReplaceMacro",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }
}

/// Per-operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub consumed: usize,
    pub stale: usize,
    pub malformed: usize,
    pub placeholders: usize,
    pub residuals: usize,
}

impl OperationStats {
    fn merge(&mut self, other: OperationStats) {
        self.consumed += other.consumed;
        self.stale += other.stale;
        self.malformed += other.malformed;
        self.placeholders += other.placeholders;
        self.residuals += other.residuals;
    }
}

/// Summary of a generation run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub source: PathBuf,
    pub generated: PathBuf,
    pub config_path: PathBuf,
    /// Whether the generated file was written
    pub written: bool,
    pub stats: OperationStats,
}

impl GenerationReport {
    pub fn succeeded(&self) -> bool {
        self.written
    }
}

pub struct CodeGenerator {
    config: GeneratorConfig,
    registry: MacroRegistry,
    scanner: ResidualScanner,
}

impl CodeGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let registry = MacroRegistry::standard().with_prefix(config.macro_prefix.clone());
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: GeneratorConfig, registry: MacroRegistry) -> Self {
        let scanner = ResidualScanner::new(&registry);
        Self {
            config,
            registry,
            scanner,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate `generated` from `source` using the sidecar next to `source`.
    pub fn generate(
        &self,
        source: &Path,
        generated: &Path,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<GenerationReport> {
        let config_path = self.config.config_path_for(source);
        debug!(
            source = %source.display(),
            generated = %generated.display(),
            config = %config_path.display(),
            encoding = %self.config.encoding,
            "starting generation"
        );

        let mut text = self.read_source(source)?;
        let mut document = self.load_document(&config_path)?;

        let mut stats = OperationStats::default();
        let mut all_succeeded = true;
        for node in document.root.children.iter_mut() {
            let Node::Element(group) = node else { continue };
            let Some(operation) = Operation::from_tag(&group.tag) else {
                continue;
            };

            let (outcome, op_stats) = self.apply(operation, group, &text, source, sink);
            stats.merge(op_stats);
            match outcome {
                SubstitutionOutcome::Text(next) => text = next,
                SubstitutionOutcome::Failed => {
                    all_succeeded = false;
                    break;
                }
            }
        }

        let mut written = false;
        if all_succeeded {
            match self.write_output(generated, &text) {
                Ok(()) => written = true,
                Err(err) => sink.emit(Diagnostic::error(generated, 0, err.to_string())),
            }
        }

        document
            .save(&config_path)
            .map_err(|source| CodegenError::ConfigWrite {
                path: config_path.clone(),
                source,
            })?;

        if written {
            sink.emit(Diagnostic::note(
                source,
                0,
                format!(
                    "Generated '{}': {} macro(s) replaced, {} stale directive(s) pruned.",
                    generated.display(),
                    stats.consumed,
                    stats.stale
                ),
            ));
        }
        info!(
            source = %source.display(),
            written,
            consumed = stats.consumed,
            stale = stats.stale,
            placeholders = stats.placeholders,
            residuals = stats.residuals,
            "generation finished"
        );

        Ok(GenerationReport {
            source: source.to_path_buf(),
            generated: generated.to_path_buf(),
            config_path,
            written,
            stats,
        })
    }

    fn read_source(&self, source: &Path) -> Result<String> {
        if !source.exists() {
            return Err(CodegenError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        let bytes = fs::read(source).map_err(|err| CodegenError::SourceUnreadable {
            path: source.to_path_buf(),
            message: err.to_string(),
        })?;
        self.config
            .encoding
            .decode(&bytes)
            .map_err(|err| CodegenError::SourceUnreadable {
                path: source.to_path_buf(),
                message: err.to_string(),
            })
    }

    fn write_output(&self, generated: &Path, text: &str) -> Result<()> {
        let bytes = self.config.encoding.encode(text)?;
        fs::write(generated, bytes).map_err(|source| CodegenError::OutputWrite {
            path: generated.to_path_buf(),
            source,
        })
    }

    fn load_document(&self, config_path: &Path) -> Result<ConfigDocument> {
        let document =
            ConfigDocument::load(config_path).map_err(|source| CodegenError::ConfigUnreadable {
                path: config_path.to_path_buf(),
                source,
            })?;

        if document.root.tag != self.config.root_tag {
            return Err(CodegenError::RootTagMismatch {
                path: config_path.to_path_buf(),
                expected: self.config.root_tag.clone(),
                found: document.root.tag.clone(),
            });
        }

        let missing: Vec<String> = Operation::ALL
            .iter()
            .filter(|op| document.root.find(op.tag()).is_none())
            .map(|op| op.tag().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CodegenError::MissingOperations {
                path: config_path.to_path_buf(),
                root: document.root.tag.clone(),
                missing,
            });
        }

        Ok(document)
    }

    fn apply(
        &self,
        operation: Operation,
        group: &mut Element,
        text: &str,
        source: &Path,
        sink: &mut dyn DiagnosticSink,
    ) -> (SubstitutionOutcome, OperationStats) {
        match operation {
            Operation::ReplaceMacro => self.replace_macros(group, text, source, sink),
        }
    }

    fn replace_macros(
        &self,
        group: &mut Element,
        text: &str,
        source: &Path,
        sink: &mut dyn DiagnosticSink,
    ) -> (SubstitutionOutcome, OperationStats) {
        let nodes = DirectiveNode::collect(group);
        let extraction =
            DirectiveExtractor::new(&self.registry).extract(&nodes, text, source, sink);
        let mut stats = OperationStats {
            consumed: extraction.consumed,
            stale: extraction.stale,
            malformed: extraction.malformed,
            ..OperationStats::default()
        };

        let text = match extraction.outcome {
            SubstitutionOutcome::Text(text) => text,
            SubstitutionOutcome::Failed => {
                write_group(group, &extraction.retained);
                return (SubstitutionOutcome::Failed, stats);
            }
        };

        let scan = self.scanner.scan(&text);
        let placeholders = scan.placeholders(&extraction.retained);
        stats.placeholders = placeholders.len();
        stats.residuals = scan.macros.len();
        write_group(group, &rewrite_directives(&extraction.retained, &placeholders));

        if scan.is_clean() {
            (SubstitutionOutcome::Text(text), stats)
        } else {
            scan.report(source, sink);
            (SubstitutionOutcome::Failed, stats)
        }
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_tags() {
        assert_eq!(Operation::from_tag("ReplaceMacro"), Some(Operation::ReplaceMacro));
        assert_eq!(Operation::from_tag("replaceMacro"), None);
        assert_eq!(Operation::ALL.len(), 1);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = OperationStats::default();
        total.merge(OperationStats {
            consumed: 2,
            stale: 1,
            ..Default::default()
        });
        total.merge(OperationStats {
            consumed: 1,
            residuals: 3,
            ..Default::default()
        });
        assert_eq!(total.consumed, 3);
        assert_eq!(total.stale, 1);
        assert_eq!(total.residuals, 3);
    }
}
