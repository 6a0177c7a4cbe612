//! Configuration rewriting
//!
//! The sidecar's directive list after a run is a pure function of what the
//! extractor retained and what the scanner found missing.

use crate::config::Element;
use crate::directive::Directive;

/// Retained directives in document order, followed by new placeholders.
pub fn rewrite_directives(retained: &[Directive], placeholders: &[Directive]) -> Vec<Directive> {
    retained.iter().chain(placeholders).cloned().collect()
}

/// Replace an operation group's elements with one `replace` element per directive.
pub fn write_group(group: &mut Element, directives: &[Directive]) {
    group.replace_elements(directives.iter().map(Directive::to_element));
}
