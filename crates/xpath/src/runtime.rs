//! Static context and error types shared by compiler and evaluator.

use crate::model::XML_NS_URI;
use crate::parser::Rule;
use pest::error::LineColLocation;
use std::collections::HashMap;
use thiserror::Error;

/// Static (compile-time) error. Any of these makes an expression unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax { line: usize, column: usize, message: String },
    #[error("unknown function {name}()")]
    UnknownFunction { name: String },
    #[error("function {name}() expects {expected} argument(s), got {found}")]
    WrongArity { name: &'static str, expected: String, found: usize },
    #[error("namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),
    #[error("variable ${0} is not bound")]
    UnboundVariable(String),
    #[error("the {0} axis is not supported")]
    UnsupportedAxis(&'static str),
    #[error("malformed parse tree: {0}")]
    Internal(String),
}

impl From<pest::error::Error<Rule>> for XPathError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) | LineColLocation::Span(pos, _) => pos,
        };
        Self::Syntax { line, column, message: err.variant.message().into_owned() }
    }
}

/// Dynamic error raised while evaluating against a particular document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{context} requires a node-set, found {found}")]
    NotANodeSet { context: &'static str, found: &'static str },
    #[error("{function}() is missing argument {index}")]
    MissingArgument { function: &'static str, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticContext {
    namespaces: HashMap<String, String>,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut namespaces = HashMap::new();
        namespaces.insert("xml".to_owned(), XML_NS_URI.to_owned());
        Self { namespaces }
    }
}

impl StaticContext {
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` for use in name tests. The `xml` prefix is pre-bound.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.ctx.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}
