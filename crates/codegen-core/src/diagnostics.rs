//! Positional diagnostics for generation runs
//!
//! Diagnostics use the `file(line): kind: message` shape that IDE build
//! output panes recognise. Output backends are pluggable through
//! [`DiagnosticSink`], so the engine never writes to a stream directly.

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Note,
    Warning,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Note => "note",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single positional notice, warning or error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line, or 0 when the message concerns the whole file
    pub line: usize,
    pub kind: MessageKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl AsRef<Path>,
        line: usize,
        kind: MessageKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.as_ref().display().to_string(),
            line,
            kind,
            message: message.into(),
        }
    }

    pub fn note(file: impl AsRef<Path>, line: usize, message: impl Into<String>) -> Self {
        Self::new(file, line, MessageKind::Note, message)
    }

    pub fn warning(file: impl AsRef<Path>, line: usize, message: impl Into<String>) -> Self {
        Self::new(file, line, MessageKind::Warning, message)
    }

    pub fn error(file: impl AsRef<Path>, line: usize, message: impl Into<String>) -> Self {
        Self::new(file, line, MessageKind::Error, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}: {}", self.file, self.line, self.kind, self.message)
    }
}

/// 1-based line of the first occurrence of `needle` in `text`.
///
/// Counts the newlines preceding the match. When `needle` is absent the
/// whole text is counted, which mirrors searching from the end.
pub fn line_of(text: &str, needle: &str) -> usize {
    let end = text.find(needle).unwrap_or(text.len());
    line_at(text, end)
}

/// 1-based line of a byte offset in `text`.
pub fn line_at(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Trait for handling diagnostic output
pub trait DiagnosticSink {
    /// Handle a single diagnostic
    fn emit(&mut self, diagnostic: Diagnostic);

    /// Number of error diagnostics seen so far
    fn error_count(&self) -> usize;
}

/// Rendering used by [`ConsoleSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// `file(line): kind: message`
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

/// Console-based sink: notes to stdout, warnings and errors to stderr
#[derive(Debug, Default)]
pub struct ConsoleSink {
    format: MessageFormat,
    errors: usize,
}

impl ConsoleSink {
    pub fn new(format: MessageFormat) -> Self {
        Self { format, errors: 0 }
    }

    fn render(&self, diagnostic: &Diagnostic) -> String {
        match self.format {
            MessageFormat::Human => diagnostic.to_string(),
            MessageFormat::Json => serde_json::to_string(diagnostic)
                .unwrap_or_else(|_| diagnostic.to_string()),
        }
    }
}

impl DiagnosticSink for ConsoleSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let rendered = self.render(&diagnostic);
        match diagnostic.kind {
            MessageKind::Note => println!("{rendered}"),
            MessageKind::Warning => eprintln!("{rendered}"),
            MessageKind::Error => {
                self.errors += 1;
                eprintln!("{rendered}");
            }
        }
    }

    fn error_count(&self) -> usize {
        self.errors
    }
}

/// Sink that keeps every diagnostic in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == MessageKind::Error)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn error_count(&self) -> usize {
        self.errors().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diagnostic = Diagnostic::error("src/Player.cpp", 12, "Unreplaced macro found");
        assert_eq!(
            diagnostic.to_string(),
            "src/Player.cpp(12): error: Unreplaced macro found"
        );

        let note = Diagnostic::note("a.cpp", 0, "done");
        assert_eq!(note.to_string(), "a.cpp(0): note: done");
    }

    #[test]
    fn test_json_rendering() {
        let sink = ConsoleSink::new(MessageFormat::Json);
        let rendered = sink.render(&Diagnostic::warning("a.cpp", 3, "pruned"));
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["file"], "a.cpp");
        assert_eq!(value["line"], 3);
        assert_eq!(value["kind"], "warning");
        assert_eq!(value["message"], "pruned");
    }

    #[test]
    fn test_line_of() {
        let text = "first\nsecond\nthird MARK\n";
        assert_eq!(line_of(text, "first"), 1);
        assert_eq!(line_of(text, "MARK"), 3);
        assert_eq!(line_at(text, 0), 1);
    }

    #[test]
    fn test_collecting_sink_counts_errors() {
        let mut sink = CollectingSink::new();
        sink.emit(Diagnostic::note("a", 0, "n"));
        sink.emit(Diagnostic::error("a", 1, "e1"));
        sink.emit(Diagnostic::error("a", 2, "e2"));
        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.diagnostics().len(), 3);
    }
}
