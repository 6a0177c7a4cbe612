/*!
# Residual Macro Scanner

Finds call sites still present after substitution. Any leftover call site
fails the run. Well-formed leftovers become empty placeholder directives so
the next run has a slot for their value; anomalous ones are only reported.
*/

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::diagnostics::{line_at, Diagnostic, DiagnosticSink};
use crate::directive::Directive;
use crate::registry::MacroRegistry;

/// How a leftover call site is treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidualClassification {
    /// Well-formed call site with no directive behind it
    Unconsumed { kind: String, name: String },
    /// Matches the call-site shape but cannot name a directive
    Invalid,
}

/// A call site found after substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidualMacro {
    /// Exact matched text
    pub literal: String,
    pub line: usize,
    pub classification: ResidualClassification,
}

impl ResidualMacro {
    pub fn name(&self) -> Option<&str> {
        match &self.classification {
            ResidualClassification::Unconsumed { name, .. } => Some(name),
            ResidualClassification::Invalid => None,
        }
    }
}

/// Everything a scan found, in text order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidualScan {
    pub macros: Vec<ResidualMacro>,
}

impl ResidualScan {
    pub fn is_clean(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn unconsumed(&self) -> impl Iterator<Item = &ResidualMacro> {
        self.macros
            .iter()
            .filter(|m| matches!(m.classification, ResidualClassification::Unconsumed { .. }))
    }

    pub fn invalid(&self) -> impl Iterator<Item = &ResidualMacro> {
        self.macros
            .iter()
            .filter(|m| m.classification == ResidualClassification::Invalid)
    }

    /// One empty directive per unconsumed name, skipping names in `existing`.
    pub fn placeholders(&self, existing: &[Directive]) -> Vec<Directive> {
        let mut seen: HashSet<&str> = existing.iter().map(|d| d.name.as_str()).collect();
        self.unconsumed()
            .filter_map(ResidualMacro::name)
            .filter(|name| seen.insert(*name))
            .map(Directive::placeholder)
            .collect()
    }

    /// Emit one error per leftover call site: unconsumed first, then invalid.
    pub fn report(&self, source: &Path, sink: &mut dyn DiagnosticSink) {
        for residual in self.unconsumed() {
            sink.emit(Diagnostic::error(
                source,
                residual.line,
                format!("Unreplaced macro found: {}", residual.literal),
            ));
        }
        for residual in self.invalid() {
            sink.emit(Diagnostic::error(
                source,
                residual.line,
                format!("Invalid macro found: {}", residual.literal),
            ));
        }
    }
}

pub struct ResidualScanner {
    pattern: Regex,
}

impl ResidualScanner {
    pub fn new(registry: &MacroRegistry) -> Self {
        // Matches `PREFIX<KIND>(`; `token_end` finds the closing parenthesis.
        let pattern = format!(r"{}([^\s()]*)\(", regex::escape(registry.prefix()));
        Self {
            pattern: Regex::new(&pattern).expect("escaped prefix forms a valid pattern"),
        }
    }

    pub fn scan(&self, text: &str) -> ResidualScan {
        let mut macros = Vec::new();
        let mut from = 0;

        while let Some(captures) = self.pattern.captures_at(text, from) {
            let (Some(head), Some(kind)) = (captures.get(0), captures.get(1)) else {
                break;
            };
            let open = head.end();
            let (end, closed) = token_end(text, open);
            let classification = if closed {
                classify(kind.as_str(), &text[open..end - 1])
            } else {
                ResidualClassification::Invalid
            };

            macros.push(ResidualMacro {
                literal: text[head.start()..end].to_string(),
                line: line_at(text, head.start()),
                classification,
            });
            from = end;
        }

        ResidualScan { macros }
    }
}

/// End of a call-site token starting at `open`, just past its closing
/// parenthesis. The token is a run of non-whitespace in which parentheses
/// must balance. Returns `false` when whitespace or the end of text comes
/// first.
fn token_end(text: &str, open: usize) -> (usize, bool) {
    let mut depth = 1usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            c if c.is_whitespace() => return (open + offset, false),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return (open + offset + 1, true);
                }
            }
            _ => {}
        }
    }
    (text.len(), false)
}

fn classify(kind: &str, token: &str) -> ResidualClassification {
    let kind_ok = !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    let name = match token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => inner,
        None => token,
    };
    let name_ok = !name.is_empty() && !name.contains('"');

    if kind_ok && name_ok {
        ResidualClassification::Unconsumed {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    } else {
        ResidualClassification::Invalid
    }
}
