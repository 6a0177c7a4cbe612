/*!
# Generation Config Document

Owned element tree for the `name.gen.xml` sidecar. The document is both an
input (directives to apply) and an output (directives pruned or added by a
run), so it is parsed into plain values and written back in a canonical
indented form with an explicit encoding declaration.
*/

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::bytes::Regex;

use crate::encoding::{EncodingError, TextEncoding};

/// Document read/write errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Document encoding: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Unexpected closing tag '{0}'")]
    UnbalancedTag(String),

    #[error("Element '{0}' is not closed")]
    UnclosedTag(String),

    #[error("Document has more than one root element ('{0}')")]
    MultipleRoots(String),
}

/// Child node of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// Element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Child elements, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.elements().find(|e| e.tag == tag)
    }

    /// Replace all child elements, keeping comments
    pub fn replace_elements(&mut self, elements: impl IntoIterator<Item = Element>) {
        self.children
            .retain(|node| matches!(node, Node::Comment(_)));
        self.children
            .extend(elements.into_iter().map(Node::Element));
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), ConfigError> {
        let mut start = BytesStart::new(self.tag.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
                Node::CData(data) => writer.write_event(Event::CData(BytesCData::new(data)))?,
                Node::Comment(comment) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.tag.as_str())))?;
        Ok(())
    }
}

/// Parsed sidecar document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    pub root: Element,
}

impl ConfigDocument {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Decode raw document bytes using the encoding named in the XML
    /// declaration (UTF-8 when absent or when a BOM is present), then parse.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let encoding = match declared_encoding(bytes) {
            Some(label) => TextEncoding::for_label(label)?,
            None => TextEncoding::utf8_bom(),
        };
        Self::parse(&encoding.decode(bytes)?)
    }

    /// Parse a document. Whitespace-only text between elements is dropped.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(end) => {
                    let tag = String::from_utf8(end.name().as_ref().to_vec())?;
                    let element = stack.pop().ok_or(ConfigError::UnbalancedTag(tag))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if let (Some(parent), false) = (stack.last_mut(), text.is_empty()) {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let data = String::from_utf8(data.into_inner().into_owned())?;
                        parent.children.push(Node::CData(data));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = String::from_utf8(comment.into_inner().into_owned())?;
                        parent.children.push(Node::Comment(comment));
                    }
                }
                Event::Eof => break,
                // Declarations, processing instructions and doctypes are regenerated on write.
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(ConfigError::UnclosedTag(open.tag));
        }
        root.map(Self::new).ok_or(ConfigError::MissingRoot)
    }

    /// Canonical text: XML declaration, four-space indentation, trailing newline.
    pub fn to_xml_string(&self) -> Result<String, ConfigError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.root.write_to(&mut writer)?;

        let mut xml = String::from_utf8(writer.into_inner())?;
        xml.push('\n');
        Ok(xml)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z][A-Za-z0-9._-]*)["']"#)
            .expect("static regex")
    })
}

/// Encoding label from `<?xml ... encoding="..."?>`, if the document has one.
fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let captures = declaration_pattern().captures(bytes)?;
    std::str::from_utf8(captures.get(1)?.as_bytes()).ok()
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, ConfigError> {
    let tag = String::from_utf8(start.name().as_ref().to_vec())?;
    let mut element = Element::new(tag);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())?;
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ConfigError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(ConfigError::MultipleRoots(element.tag)),
    }
    Ok(())
}
