//! Substitution directives declared in the sidecar document

use crate::config::Element;

/// Tag of a directive element inside an operation group
pub const DIRECTIVE_TAG: &str = "replace";
pub const NAME_ATTRIBUTE: &str = "name";
pub const VALUE_ATTRIBUTE: &str = "value";

/// A named substitution request. The value is always text; it is validated
/// and formatted according to the kind of the call site it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directive {
    pub name: String,
    pub value: String,
}

impl Directive {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Directive with an empty value, waiting for a human to fill it in
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    pub fn to_element(&self) -> Element {
        Element::new(DIRECTIVE_TAG)
            .with_attribute(NAME_ATTRIBUTE, self.name.as_str())
            .with_attribute(VALUE_ATTRIBUTE, self.value.as_str())
    }
}

/// A child of an operation group, as found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveNode {
    /// Well-formed `<replace name=".." value=".."/>`
    Directive(Directive),
    /// `<replace>` lacking `name` or `value`
    Malformed,
    /// Any other element; carries its tag
    Foreign(String),
}

impl DirectiveNode {
    pub fn from_element(element: &Element) -> Self {
        if element.tag != DIRECTIVE_TAG {
            return Self::Foreign(element.tag.clone());
        }
        match (
            element.attribute(NAME_ATTRIBUTE),
            element.attribute(VALUE_ATTRIBUTE),
        ) {
            (Some(name), Some(value)) if !name.is_empty() => {
                Self::Directive(Directive::new(name, value))
            }
            _ => Self::Malformed,
        }
    }

    /// Read every element child of an operation group
    pub fn collect(group: &Element) -> Vec<Self> {
        group.elements().map(Self::from_element).collect()
    }

    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            Self::Directive(directive) => Some(directive),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_elements() {
        let group = Element::new("ReplaceMacro")
            .with_child(
                Element::new("replace")
                    .with_attribute("name", "count")
                    .with_attribute("value", "42"),
            )
            .with_child(Element::new("replace").with_attribute("name", "orphan"))
            .with_child(
                Element::new("replace")
                    .with_attribute("name", "")
                    .with_attribute("value", "1"),
            )
            .with_child(Element::new("note"));

        assert_eq!(
            DirectiveNode::collect(&group),
            vec![
                DirectiveNode::Directive(Directive::new("count", "42")),
                DirectiveNode::Malformed,
                DirectiveNode::Malformed,
                DirectiveNode::Foreign("note".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_value_is_well_formed() {
        let element = Directive::placeholder("title").to_element();
        assert_eq!(element.attribute("value"), Some(""));
        assert_eq!(
            DirectiveNode::from_element(&element),
            DirectiveNode::Directive(Directive::new("title", ""))
        );
    }
}
