/*!
# Macro Type Registry

Ordered, immutable table of macro kinds. Each kind pairs a validator (is
this declared value acceptable?) with a formatter (how does an accepted
value appear in generated source?).

Iteration order is registration order and acts as the tie-break when a
directive name could match more than one kind.
*/

use std::sync::OnceLock;

use regex::Regex;

/// Prefix shared by every macro call site
pub const DEFAULT_MACRO_PREFIX: &str = "CLN2D_GEN_REPLACE_";

/// Renders an accepted value as source text
pub type Formatter = fn(&str) -> String;

/// Decides whether a declared value is acceptable for a kind
pub type Validator = fn(&str) -> bool;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Macro kind '{0}' is already registered")]
    Duplicate(String),

    #[error("Macro kind name '{0}' must be a non-empty identifier")]
    InvalidName(String),
}

/// One macro kind: `STRING`, `INT`, ...
#[derive(Clone, Copy)]
pub struct MacroType {
    pub name: &'static str,
    pub formatter: Formatter,
    pub validator: Validator,
}

impl MacroType {
    pub const fn new(name: &'static str, formatter: Formatter, validator: Validator) -> Self {
        Self {
            name,
            formatter,
            validator,
        }
    }

    pub fn format(&self, value: &str) -> String {
        (self.formatter)(value)
    }

    pub fn validate(&self, value: &str) -> bool {
        (self.validator)(value)
    }
}

impl std::fmt::Debug for MacroType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroType").field("name", &self.name).finish()
    }
}

fn int_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?[0-9]+$").expect("static regex"))
}

fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("static regex"))
}

fn format_string(value: &str) -> String {
    format!("\"{value}\"")
}

fn format_char(value: &str) -> String {
    format!("'{value}'")
}

fn format_verbatim(value: &str) -> String {
    value.to_string()
}

fn accept_any(_value: &str) -> bool {
    true
}

fn is_single_char(value: &str) -> bool {
    value.chars().count() == 1
}

fn is_int(value: &str) -> bool {
    int_pattern().is_match(value)
}

fn is_float(value: &str) -> bool {
    float_pattern().is_match(value)
}

fn is_bool(value: &str) -> bool {
    matches!(value, "true" | "false")
}

/// Built-in kinds, in lookup order
pub const STANDARD_TYPES: [MacroType; 5] = [
    MacroType::new("STRING", format_string, accept_any),
    MacroType::new("CHAR", format_char, is_single_char),
    MacroType::new("INT", format_verbatim, is_int),
    MacroType::new("FLOAT", format_verbatim, is_float),
    MacroType::new("BOOL", format_verbatim, is_bool),
];

/// Immutable ordered table of macro kinds
#[derive(Debug, Clone)]
pub struct MacroRegistry {
    prefix: String,
    types: Vec<MacroType>,
}

impl MacroRegistry {
    /// Registry with the built-in kinds and the default prefix.
    pub fn standard() -> Self {
        Self {
            prefix: DEFAULT_MACRO_PREFIX.to_string(),
            types: STANDARD_TYPES.to_vec(),
        }
    }

    pub fn builder(prefix: impl Into<String>) -> MacroRegistryBuilder {
        MacroRegistryBuilder {
            prefix: prefix.into(),
            types: Vec::new(),
        }
    }

    /// Same kinds, different call-site prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn types(&self) -> &[MacroType] {
        &self.types
    }

    pub fn get(&self, name: &str) -> Option<&MacroType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Call-site literal with a bare argument: `PREFIX_KIND(name)`
    pub fn unquoted_call(&self, macro_type: &MacroType, name: &str) -> String {
        format!("{}{}({})", self.prefix, macro_type.name, name)
    }

    /// Call-site literal with a string-literal argument: `PREFIX_KIND("name")`
    pub fn quoted_call(&self, macro_type: &MacroType, name: &str) -> String {
        format!("{}{}(\"{}\")", self.prefix, macro_type.name, name)
    }
}

impl Default for MacroRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builds a [`MacroRegistry`], rejecting duplicate kinds
#[derive(Debug)]
pub struct MacroRegistryBuilder {
    prefix: String,
    types: Vec<MacroType>,
}

impl MacroRegistryBuilder {
    pub fn with_standard_types(mut self) -> Result<Self, RegistryError> {
        for macro_type in STANDARD_TYPES {
            self = self.register(macro_type)?;
        }
        Ok(self)
    }

    pub fn register(mut self, macro_type: MacroType) -> Result<Self, RegistryError> {
        let valid_name = !macro_type.name.is_empty()
            && macro_type
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(RegistryError::InvalidName(macro_type.name.to_string()));
        }
        if self.types.iter().any(|t| t.name == macro_type.name) {
            return Err(RegistryError::Duplicate(macro_type.name.to_string()));
        }
        self.types.push(macro_type);
        Ok(self)
    }

    pub fn build(self) -> MacroRegistry {
        MacroRegistry {
            prefix: self.prefix,
            types: self.types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(name: &str) -> MacroType {
        *MacroRegistry::standard().get(name).unwrap()
    }

    #[test]
    fn test_standard_order() {
        let registry = MacroRegistry::standard();
        let names: Vec<_> = registry.types().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["STRING", "CHAR", "INT", "FLOAT", "BOOL"]);
    }

    #[test]
    fn test_validators() {
        let cases = vec![
            ("STRING", "", true),
            ("STRING", "hello world", true),
            ("CHAR", "a", true),
            ("CHAR", "あ", true),
            ("CHAR", "ab", false),
            ("CHAR", "", false),
            ("INT", "42", true),
            ("INT", "-7", true),
            ("INT", "--7", false),
            ("INT", "4.2", false),
            ("INT", "", false),
            ("INT", "-", false),
            ("FLOAT", "3", true),
            ("FLOAT", "-0.25", true),
            ("FLOAT", "1.", false),
            ("FLOAT", ".5", false),
            ("FLOAT", "1e5", false),
            ("BOOL", "true", true),
            ("BOOL", "false", true),
            ("BOOL", "True", false),
            ("BOOL", "maybe", false),
        ];

        for (name, value, expected) in cases {
            assert_eq!(
                kind(name).validate(value),
                expected,
                "{name} validator on '{value}'"
            );
        }
    }

    #[test]
    fn test_formatters() {
        assert_eq!(kind("STRING").format("title"), "\"title\"");
        assert_eq!(kind("CHAR").format("x"), "'x'");
        assert_eq!(kind("INT").format("-3"), "-3");
        assert_eq!(kind("FLOAT").format("0.5"), "0.5");
        assert_eq!(kind("BOOL").format("true"), "true");
    }

    #[test]
    fn test_call_literals() {
        let registry = MacroRegistry::standard();
        let int = kind("INT");
        assert_eq!(
            registry.unquoted_call(&int, "count"),
            "CLN2D_GEN_REPLACE_INT(count)"
        );
        assert_eq!(
            registry.quoted_call(&int, "count"),
            "CLN2D_GEN_REPLACE_INT(\"count\")"
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = MacroRegistry::builder(DEFAULT_MACRO_PREFIX)
            .with_standard_types()
            .and_then(|b| b.register(MacroType::new("INT", format_verbatim, is_int)));
        assert_eq!(result.unwrap_err(), RegistryError::Duplicate("INT".to_string()));
    }

    #[test]
    fn test_custom_kind() {
        fn is_hex(value: &str) -> bool {
            value.starts_with("0x") && value.len() > 2
        }

        let registry = MacroRegistry::builder("GEN_")
            .register(MacroType::new("HEX", format_verbatim, is_hex))
            .unwrap()
            .build();
        let hex = *registry.get("HEX").unwrap();
        assert!(hex.validate("0xff"));
        assert_eq!(registry.unquoted_call(&hex, "mask"), "GEN_HEX(mask)");
        let bad = MacroType::new("BAD KIND", format_verbatim, is_hex);
        assert!(matches!(
            MacroRegistry::builder("GEN_").register(bad),
            Err(RegistryError::InvalidName(_))
        ));
    }
}
