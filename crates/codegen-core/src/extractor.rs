/*!
# Directive Extractor

Applies declared directives to source text. For each directive, in document
order, the registry's kinds are tried in order; the first kind whose call
site (`KIND(name)`, else `KIND("name")`) occurs in the text decides how the
value is validated and formatted. Every occurrence of either literal form
for that kind is then replaced in one pass.

A rejected value aborts the whole substitution. Directives that match no
call site, and nodes that are not well-formed directives, are left out of
the retained set so the rewritten document no longer carries them.
*/

use std::path::Path;

use tracing::{debug, warn};

use crate::diagnostics::{line_of, Diagnostic, DiagnosticSink};
use crate::directive::{Directive, DirectiveNode};
use crate::registry::{MacroRegistry, MacroType};

/// Result of a substitution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionOutcome {
    /// Substituted text
    Text(String),
    /// Errors were reported; nothing may be written
    Failed,
}

impl SubstitutionOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// What a pass did with the directive list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub outcome: SubstitutionOutcome,
    /// Directives that persist in the document, in document order
    pub retained: Vec<Directive>,
    /// Directives whose call site was found and substituted
    pub consumed: usize,
    /// Well-formed directives dropped because no call site uses them
    pub stale: usize,
    /// Foreign or malformed nodes dropped from the group
    pub malformed: usize,
}

/// A call site located for a directive
#[derive(Debug, Clone, Copy)]
struct CallSite<'r> {
    macro_type: &'r MacroType,
    quoted: bool,
}

pub struct DirectiveExtractor<'r> {
    registry: &'r MacroRegistry,
}

impl<'r> DirectiveExtractor<'r> {
    pub fn new(registry: &'r MacroRegistry) -> Self {
        Self { registry }
    }

    /// Run one substitution pass over `text`.
    pub fn extract(
        &self,
        nodes: &[DirectiveNode],
        text: &str,
        source: &Path,
        sink: &mut dyn DiagnosticSink,
    ) -> Extraction {
        let mut text = text.to_string();
        let mut retained = Vec::new();
        let mut consumed = 0;
        let mut stale = 0;
        let mut malformed = 0;

        for (index, node) in nodes.iter().enumerate() {
            let directive = match node {
                DirectiveNode::Directive(directive) => directive,
                DirectiveNode::Foreign(tag) => {
                    debug!(tag = %tag, "dropping foreign element from operation group");
                    malformed += 1;
                    continue;
                }
                DirectiveNode::Malformed => {
                    debug!("dropping directive without name or value");
                    malformed += 1;
                    continue;
                }
            };

            let Some((site, literal)) = self.locate(directive, &text) else {
                warn!(name = %directive.name, "directive matches no call site, pruning");
                stale += 1;
                continue;
            };

            if !site.macro_type.validate(&directive.value) {
                sink.emit(Diagnostic::error(
                    source,
                    line_of(&text, &literal),
                    format!("Invalid value '{}' for '{}'.", directive.value, literal),
                ));

                // Remaining directives were never evaluated; keep them as declared.
                retained.extend(
                    nodes[index..]
                        .iter()
                        .filter_map(DirectiveNode::as_directive)
                        .cloned(),
                );
                return Extraction {
                    outcome: SubstitutionOutcome::Failed,
                    retained,
                    consumed,
                    stale,
                    malformed,
                };
            }

            let replacement = site.macro_type.format(&directive.value);
            debug!(
                name = %directive.name,
                kind = site.macro_type.name,
                quoted = site.quoted,
                "substituting {literal} with {replacement}"
            );
            // Both literal forms name the same call site.
            for form in [
                self.registry.unquoted_call(site.macro_type, &directive.name),
                self.registry.quoted_call(site.macro_type, &directive.name),
            ] {
                text = text.replace(&form, &replacement);
            }
            consumed += 1;
            retained.push(directive.clone());
        }

        Extraction {
            outcome: SubstitutionOutcome::Text(text),
            retained,
            consumed,
            stale,
            malformed,
        }
    }

    /// First kind, in registry order, whose call site occurs in `text`.
    fn locate(&self, directive: &Directive, text: &str) -> Option<(CallSite<'r>, String)> {
        let registry: &'r MacroRegistry = self.registry;
        registry.types().iter().find_map(|macro_type| {
            let unquoted = registry.unquoted_call(macro_type, &directive.name);
            if text.contains(&unquoted) {
                return Some((CallSite { macro_type, quoted: false }, unquoted));
            }
            let quoted = registry.quoted_call(macro_type, &directive.name);
            if text.contains(&quoted) {
                return Some((CallSite { macro_type, quoted: true }, quoted));
            }
            None
        })
    }
}
