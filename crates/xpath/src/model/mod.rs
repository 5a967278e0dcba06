//! Read-only XML document tree and the parser that builds it.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by [`NodeId`].
//! Ids are handed out in document order: an element is followed by its
//! attributes, then by its children. Document-order comparison is therefore a
//! plain comparison of ids.

mod document;
mod entities;
mod parser;

pub use document::{Document, NodeId, NodeKind, XML_NS_URI, XmlName};
pub use parser::{DocumentParser, DocumentParserBuilder, ParserConfigError, ParserOptions, XmlError};
