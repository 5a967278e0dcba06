//! XPath 1.0 value types and the conversions between them.

use crate::model::{Document, NodeId};
use crate::runtime::EvalError;

/// Result of evaluating an expression.
///
/// Node-sets are kept in document order without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue {
    NodeSet(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl XPathValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NodeSet(_) => "node-set",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Self::NodeSet(nodes) => !nodes.is_empty(),
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::String(s) => string_to_number(s),
            Self::NodeSet(_) => string_to_number(&self.to_xpath_string(doc)),
        }
    }

    /// `string()` conversion; for node-sets the string-value of the first node.
    pub fn to_xpath_string(&self, doc: &Document) -> String {
        match self {
            Self::NodeSet(nodes) => nodes.first().map(|&n| doc.string_value(n)).unwrap_or_default(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::String(s) => s.clone(),
        }
    }

    pub fn into_node_set(self, context: &'static str) -> Result<Vec<NodeId>, EvalError> {
        match self {
            Self::NodeSet(nodes) => Ok(nodes),
            other => Err(EvalError::NotANodeSet { context, found: other.type_name() }),
        }
    }
}

/// XPath `number()` on a string: optional surrounding whitespace, an optional
/// minus sign, digits with at most one decimal point. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1
        && digits != ".";
    if valid { trimmed.parse::<f64>().unwrap_or(f64::NAN) } else { f64::NAN }
}

/// XPath number-to-string: no exponent, integers without a fraction,
/// `NaN`, `Infinity`, `-Infinity`, and `0` for both zeros.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() }
    } else if n == 0.0 {
        "0".to_owned()
    } else {
        format!("{n}")
    }
}
