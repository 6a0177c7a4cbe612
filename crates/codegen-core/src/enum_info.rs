/*!
# Enum Info Generator

Emits the static tables behind `EnumInfo<T>` for every enum declared as

```text
DEFINE_ENUM()
enum class Name [: underlying] { A, B = 2, C };
```

The header is treated as plain text: comments are stripped, declarations
are found by pattern, and initialisers are discarded.
*/

use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::encoding::TextEncoding;
use crate::{CodegenError, Result};

fn line_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"//.*").expect("static regex"))
}

fn block_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/\*[\s\S]*?\*/").expect("static regex"))
}

fn enum_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?m)^\s*DEFINE_ENUM\s*\(\s*\)\s*enum\s+class\s+(\w+)",
            r"\s*(?::\s*[\w\s]+)?\s*\{([\s\S]*?)\}\s*;",
        ))
        .expect("static regex")
    })
}

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r",\s*").expect("static regex"))
}

/// One `DEFINE_ENUM()` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub enumerators: Vec<String>,
}

/// Remove `//` line comments, then `/* */` block comments.
pub fn strip_comments(source: &str) -> String {
    let without_lines = line_comment_pattern().replace_all(source, "");
    block_comment_pattern()
        .replace_all(&without_lines, "")
        .into_owned()
}

/// Find every `DEFINE_ENUM()` enum in `source`.
///
/// A name declared twice keeps its first position and its last body.
pub fn parse_enums(source: &str) -> Vec<EnumDecl> {
    let stripped = strip_comments(source);
    let mut enums: IndexMap<String, Vec<String>> = IndexMap::new();

    for captures in enum_pattern().captures_iter(&stripped) {
        let (Some(name), Some(body)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let enumerators = separator_pattern()
            .split(body.as_str().trim())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match item.split_once('=') {
                Some((enumerator, _initialiser)) => enumerator.trim().to_string(),
                None => item.to_string(),
            })
            .collect();
        enums.insert(name.as_str().to_string(), enumerators);
    }

    enums
        .into_iter()
        .map(|(name, enumerators)| EnumDecl { name, enumerators })
        .collect()
}

/// Render the generated translation unit.
pub fn render_enum_info(include_path: &str, enums: &[EnumDecl]) -> String {
    let mut out = format!("#include \"{include_path}\"\n\n");
    for decl in enums {
        let name = &decl.name;

        out.push_str(&format!("std::vector<{name}> EnumInfo<{name}>::enumerators =\n{{\n"));
        for enumerator in &decl.enumerators {
            out.push_str(&format!("    {name}::{enumerator},\n"));
        }
        out.push_str("};\n\n");

        out.push_str(&format!(
            "std::unordered_map<std::string, {name}> EnumInfo<{name}>::name_to_enum_map =\n{{\n"
        ));
        for enumerator in &decl.enumerators {
            out.push_str(&format!("    {{\"{enumerator}\", {name}::{enumerator}}},\n"));
        }
        out.push_str("};\n\n");
    }
    out
}

/// Path of `target` relative to the directory `base`, `/`-separated.
pub fn relative_include_path(target: &Path, base: &Path) -> io::Result<String> {
    let target = absolutize(target)?;
    let base = absolutize(base)?;

    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    if parts.is_empty() {
        parts.push(".".to_string());
    }
    Ok(parts.join("/"))
}

fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// File-level driver for the enum tables
#[derive(Debug, Clone, Default)]
pub struct EnumInfoGenerator {
    encoding: TextEncoding,
}

impl EnumInfoGenerator {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    /// Read `source`, write the tables to `generated`, return the enums found.
    pub fn generate(
        &self,
        source: &Path,
        generated: &Path,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Vec<EnumDecl>> {
        if !source.exists() {
            return Err(CodegenError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        let bytes = fs::read(source).map_err(|err| CodegenError::SourceUnreadable {
            path: source.to_path_buf(),
            message: err.to_string(),
        })?;
        let text = self
            .encoding
            .decode(&bytes)
            .map_err(|err| CodegenError::SourceUnreadable {
                path: source.to_path_buf(),
                message: err.to_string(),
            })?;

        let base = generated.parent().unwrap_or_else(|| Path::new(""));
        let include_path =
            relative_include_path(source, base).map_err(|err| CodegenError::SourceUnreadable {
                path: source.to_path_buf(),
                message: format!("Error calculating relative path: {err}"),
            })?;

        let enums = parse_enums(&text);
        debug!(
            source = %source.display(),
            enums = ?enums.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "parsed enum declarations"
        );

        let output = render_enum_info(&include_path, &enums);
        let bytes = self.encoding.encode(&output)?;
        fs::write(generated, bytes).map_err(|source| CodegenError::OutputWrite {
            path: generated.to_path_buf(),
            source,
        })?;

        sink.emit(Diagnostic::note(
            source,
            0,
            format!("Generated file: {}", generated.display()),
        ));
        info!(
            source = %source.display(),
            generated = %generated.display(),
            count = enums.len(),
            "enum info generated"
        );
        Ok(enums)
    }
}
