//! Namespace-aware XML parser producing [`Document`] trees.
//!
//! Built on `quick-xml`'s namespace resolving reader. The reader checks tag
//! balance, attribute syntax and comment syntax. Character and name
//! productions, prolog placement and expanded-name uniqueness are checked
//! here, and the tree builder adds the document-level checks (single root
//! element, no text outside it, depth).

use super::document::{Document, NodeData, NodeId, NodeKind, XML_NS_URI, XmlName};
use super::entities::Entities;
use compact_str::CompactString;
use itertools::Itertools;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Parser configuration. Loadable from host configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserOptions {
    /// Resolve prefixes to namespace URIs and treat `xmlns` attributes as
    /// declarations. When off, names are kept verbatim.
    pub namespace_aware: bool,
    /// Drop comment nodes while building the tree.
    pub ignore_comments: bool,
    /// Maximum element nesting depth; `None` disables the check.
    pub max_depth: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { namespace_aware: true, ignore_comments: true, max_depth: Some(DEFAULT_MAX_DEPTH) }
    }
}

impl ParserOptions {
    pub fn validate(&self) -> Result<(), ParserConfigError> {
        if self.max_depth == Some(0) {
            return Err(ParserConfigError::ZeroMaxDepth);
        }
        Ok(())
    }
}

/// A [`ParserOptions`] value that cannot produce a working parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserConfigError {
    #[error("max_depth must be at least 1")]
    ZeroMaxDepth,
}

/// Input that is not a well-formed XML document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("invalid UTF-8 in XML input at byte {position}")]
    Encoding { position: u64 },
    #[error("character U+{code:04X} is not allowed in XML (byte {position})")]
    IllegalCharacter { code: u32, position: u64 },
    #[error("'{name}' is not a valid XML name (byte {position})")]
    InvalidName { name: String, position: u64 },
    #[error("attribute '{name}' is specified twice (byte {position})")]
    DuplicateAttribute { name: String, position: u64 },
    #[error("unresolvable reference at byte {position}: {message}")]
    Reference { position: u64, message: String },
    #[error("namespace prefix '{prefix}' is not bound (byte {position})")]
    UnboundPrefix { prefix: String, position: u64 },
    #[error("text content outside of the root element at byte {position}")]
    TextOutsideRoot { position: u64 },
    #[error("second root element <{name}> at byte {position}")]
    MultipleRoots { name: String, position: u64 },
    #[error("document has no root element")]
    NoRootElement,
    #[error("element <{name}> is not closed")]
    UnclosedElement { name: String },
    #[error("element nesting exceeds the maximum depth of {limit}")]
    TooDeep { limit: usize },
    #[error("document exceeds the maximum number of nodes")]
    TooLarge,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentParserBuilder {
    options: ParserOptions,
}

impl DocumentParserBuilder {
    pub fn namespace_aware(mut self, enabled: bool) -> Self {
        self.options.namespace_aware = enabled;
        self
    }

    pub fn ignore_comments(mut self, enabled: bool) -> Self {
        self.options.ignore_comments = enabled;
        self
    }

    pub fn max_depth(mut self, limit: Option<usize>) -> Self {
        self.options.max_depth = limit;
        self
    }

    pub fn build(self) -> Result<DocumentParser, ParserConfigError> {
        DocumentParser::with_options(self.options)
    }
}

/// Reusable parser; holds no per-document state.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    options: ParserOptions,
}

impl DocumentParser {
    pub fn builder() -> DocumentParserBuilder {
        DocumentParserBuilder::default()
    }

    pub fn with_options(options: ParserOptions) -> Result<Self, ParserConfigError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn parse(&self, input: &str) -> Result<Document, XmlError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut reader = NsReader::from_str(input);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = true;
        config.check_comments = true;
        config.expand_empty_elements = false;

        let mut tree = TreeBuilder::new(&self.options);
        let mut seen_doctype = false;
        loop {
            let position = reader.buffer_position() as u64;
            let event = reader.read_event().map_err(|err| XmlError::Syntax {
                position: reader.error_position() as u64,
                message: err.to_string(),
            })?;
            match event {
                Event::Start(start) => {
                    let (name, attributes) = self.element(&reader, &start, &tree.entities, position)?;
                    tree.open_element(name, attributes, position)?;
                }
                Event::Empty(start) => {
                    let (name, attributes) = self.element(&reader, &start, &tree.entities, position)?;
                    tree.open_element(name, attributes, position)?;
                    tree.close_element()?;
                }
                Event::End(_) => tree.close_element()?,
                Event::Text(text) => {
                    let raw = utf8(&text, position)?;
                    if raw.contains("]]>") {
                        return Err(XmlError::Syntax { position, message: "`]]>` in character data".into() });
                    }
                    let text = tree.entities.expand(raw, position)?;
                    check_chars(&text, position)?;
                    tree.push_text(&normalize_newlines(&text), position)?;
                }
                Event::CData(cdata) => {
                    let text = utf8(&cdata, position)?;
                    check_chars(text, position)?;
                    tree.push_text(&normalize_newlines(text), position)?;
                }
                Event::GeneralRef(reference) => {
                    let name = utf8(&reference, position)?;
                    let resolved = tree.entities.resolve(name, position)?;
                    tree.push_text(&resolved, position)?;
                }
                Event::Comment(comment) => {
                    let text = utf8(&comment, position)?;
                    check_chars(text, position)?;
                    if !self.options.ignore_comments {
                        tree.push_leaf(NodeKind::Comment, None, normalize_newlines(text).into_owned())?;
                    }
                }
                Event::PI(pi) => {
                    let target = utf8(pi.target(), position)?;
                    if !is_name(target) || (self.options.namespace_aware && target.contains(':')) {
                        return Err(XmlError::InvalidName { name: target.to_owned(), position });
                    }
                    if target.eq_ignore_ascii_case("xml") {
                        return Err(XmlError::Syntax {
                            position,
                            message: format!("processing instruction target '{target}' is reserved"),
                        });
                    }
                    let content = utf8(pi.content(), position)?.trim_start();
                    check_chars(content, position)?;
                    let value = normalize_newlines(content).into_owned();
                    tree.push_leaf(NodeKind::ProcessingInstruction, Some(XmlName::local(target)), value)?;
                }
                Event::Decl(_) => {
                    if position != 0 {
                        return Err(XmlError::Syntax {
                            position,
                            message: "XML declaration is only allowed at the start of the document".into(),
                        });
                    }
                }
                Event::DocType(doctype) => {
                    if seen_doctype || tree.has_root {
                        return Err(XmlError::Syntax {
                            position,
                            message: "document type declaration must precede the root element".into(),
                        });
                    }
                    seen_doctype = true;
                    let doctype = utf8(&doctype, position)?;
                    check_chars(doctype, position)?;
                    tree.entities.declare_from_doctype(doctype, position)?;
                }
                Event::Eof => break,
            }
        }
        tree.finish()
    }

    fn element(
        &self,
        reader: &NsReader<&[u8]>,
        start: &BytesStart<'_>,
        entities: &Entities,
        position: u64,
    ) -> Result<(XmlName, Vec<(XmlName, String)>), XmlError> {
        let qname = start.name();
        check_name(utf8(qname.into_inner(), position)?, self.options.namespace_aware, position)?;
        let name = if self.options.namespace_aware {
            let (resolved, local) = reader.resolve_element(qname);
            expanded_name(resolved, qname.prefix().map(|p| p.into_inner()), local.into_inner(), position)?
        } else {
            XmlName::local(utf8(qname.into_inner(), position)?)
        };

        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|err| XmlError::Syntax { position, message: err.to_string() })?;
            let key = attribute.key;
            check_name(utf8(key.into_inner(), position)?, self.options.namespace_aware, position)?;
            let raw = utf8(&attribute.value, position)?;
            if raw.contains('<') {
                return Err(XmlError::Syntax { position, message: "`<` in attribute value".into() });
            }
            let value = attribute_value(raw, entities, position)?;
            let attr_name = if self.options.namespace_aware {
                if key.as_namespace_binding().is_some() {
                    continue;
                }
                let (resolved, local) = reader.resolve_attribute(key);
                expanded_name(resolved, key.prefix().map(|p| p.into_inner()), local.into_inner(), position)?
            } else {
                XmlName::local(utf8(key.into_inner(), position)?)
            };
            attributes.push((attr_name, value));
        }
        let twice = attributes
            .iter()
            .duplicates_by(|(n, _)| (n.ns_uri.clone(), n.local.clone()))
            .next()
            .map(|(n, _)| n.to_string());
        if let Some(name) = twice {
            return Err(XmlError::DuplicateAttribute { name, position });
        }
        Ok((name, attributes))
    }
}

fn expanded_name(
    resolved: ResolveResult<'_>,
    prefix: Option<&[u8]>,
    local: &[u8],
    position: u64,
) -> Result<XmlName, XmlError> {
    let ns_uri = match resolved {
        ResolveResult::Bound(ns) => Some(utf8(ns.into_inner(), position)?).filter(|uri| !uri.is_empty()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(unknown) if unknown == b"xml" => Some(XML_NS_URI),
        ResolveResult::Unknown(unknown) => {
            return Err(XmlError::UnboundPrefix {
                prefix: String::from_utf8_lossy(&unknown).into_owned(),
                position,
            });
        }
    };
    let prefix = prefix.map(|p| utf8(p, position)).transpose()?;
    Ok(XmlName {
        prefix: prefix.map(CompactString::from),
        local: CompactString::from(utf8(local, position)?),
        ns_uri: ns_uri.map(CompactString::from),
    })
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|_| XmlError::Encoding { position })
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Attribute-value normalization: line ends and tabs become spaces before
/// references are resolved, so `&#10;` survives as a newline.
fn attribute_value(raw: &str, entities: &Entities, position: u64) -> Result<String, XmlError> {
    let normalized: String = normalize_newlines(raw)
        .chars()
        .map(|ch| match ch {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect();
    let value = entities.expand(&normalized, position)?;
    check_chars(&value, position)?;
    Ok(value)
}

/// The XML 1.0 `Char` production.
pub(crate) fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

pub(crate) fn check_chars(text: &str, position: u64) -> Result<(), XmlError> {
    match text.chars().find(|ch| !is_xml_char(*ch)) {
        Some(ch) => Err(XmlError::IllegalCharacter { code: u32::from(ch), position }),
        None => Ok(()),
    }
}

fn is_name_start_char(ch: char) -> bool {
    matches!(ch,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(ch: char) -> bool {
    is_name_start_char(ch)
        || matches!(ch, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// Checks the `Name` production, or `QName` when namespaces are processed
/// (at most one colon, with a non-empty prefix and local part).
fn check_name(name: &str, qualified: bool, position: u64) -> Result<(), XmlError> {
    let valid = if qualified {
        let ncname = |part: &str| !part.contains(':') && is_name(part);
        match name.split_once(':') {
            Some((prefix, local)) => ncname(prefix) && ncname(local),
            None => ncname(name),
        }
    } else {
        is_name(name)
    };
    if valid { Ok(()) } else { Err(XmlError::InvalidName { name: name.to_owned(), position }) }
}

fn is_xml_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

struct TreeBuilder<'o> {
    options: &'o ParserOptions,
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
    text: String,
    has_root: bool,
    entities: Entities,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o ParserOptions) -> Self {
        let root = NodeId::from_index(0);
        Self {
            options,
            nodes: vec![NodeData::new(NodeKind::Document, root, None)],
            open: vec![root],
            text: String::new(),
            has_root: false,
            entities: Entities::default(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| NodeId::from_index(0))
    }

    fn at_document_level(&self) -> bool {
        self.open.len() == 1
    }

    fn alloc(&mut self, kind: NodeKind, parent: NodeId) -> Result<NodeId, XmlError> {
        let index = self.nodes.len();
        if index >= u32::MAX as usize {
            return Err(XmlError::TooLarge);
        }
        let id = NodeId::from_index(index);
        self.nodes.push(NodeData::new(kind, id, Some(parent)));
        Ok(id)
    }

    fn push_text(&mut self, text: &str, position: u64) -> Result<(), XmlError> {
        if self.at_document_level() {
            if text.chars().all(is_xml_whitespace) {
                return Ok(());
            }
            return Err(XmlError::TextOutsideRoot { position });
        }
        self.text.push_str(text);
        Ok(())
    }

    fn flush_text(&mut self) -> Result<(), XmlError> {
        if self.text.is_empty() {
            return Ok(());
        }
        let parent = self.current();
        let id = self.alloc(NodeKind::Text, parent)?;
        self.nodes[id.index()].value = std::mem::take(&mut self.text);
        self.nodes[parent.index()].children.push(id);
        Ok(())
    }

    fn open_element(
        &mut self,
        name: XmlName,
        attributes: Vec<(XmlName, String)>,
        position: u64,
    ) -> Result<(), XmlError> {
        self.flush_text()?;
        if self.at_document_level() {
            if self.has_root {
                return Err(XmlError::MultipleRoots { name: name.to_string(), position });
            }
            self.has_root = true;
        }
        if let Some(limit) = self.options.max_depth {
            if self.open.len() > limit {
                return Err(XmlError::TooDeep { limit });
            }
        }

        let parent = self.current();
        let id = self.alloc(NodeKind::Element, parent)?;
        self.nodes[id.index()].name = Some(name);
        for (attr_name, value) in attributes {
            let attr = self.alloc(NodeKind::Attribute, id)?;
            let data = &mut self.nodes[attr.index()];
            data.name = Some(attr_name);
            data.value = value;
            self.nodes[id.index()].attributes.push(attr);
        }
        self.nodes[parent.index()].children.push(id);
        self.open.push(id);
        Ok(())
    }

    fn close_element(&mut self) -> Result<(), XmlError> {
        self.flush_text()?;
        if self.open.len() > 1 {
            if let Some(id) = self.open.pop() {
                self.nodes[id.index()].subtree_end = NodeId::from_index(self.nodes.len() - 1);
            }
        }
        Ok(())
    }

    fn push_leaf(&mut self, kind: NodeKind, name: Option<XmlName>, value: String) -> Result<(), XmlError> {
        self.flush_text()?;
        let parent = self.current();
        let id = self.alloc(kind, parent)?;
        let data = &mut self.nodes[id.index()];
        data.name = name;
        data.value = value;
        self.nodes[parent.index()].children.push(id);
        Ok(())
    }

    fn finish(mut self) -> Result<Document, XmlError> {
        self.flush_text()?;
        if self.open.len() > 1 {
            let name = self.nodes[self.current().index()]
                .name
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(XmlError::UnclosedElement { name });
        }
        if !self.has_root {
            return Err(XmlError::NoRootElement);
        }
        self.nodes[0].subtree_end = NodeId::from_index(self.nodes.len() - 1);
        Ok(Document::from_nodes(self.nodes))
    }
}
