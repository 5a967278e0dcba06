//! String extraction: evaluate an expression and reduce the result to the
//! text a caller would store, or report why there is none.

use crate::compiler::CompiledXPath;
use crate::evaluator;
use crate::model::Document;
use crate::runtime::EvalError;
use crate::xdm::XPathValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Value(String),
    Miss(MissReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissReason {
    /// The expression selected no nodes.
    EmptyNodeSet,
    /// The expression raised a dynamic error against this document.
    Evaluation(EvalError),
}

impl Extraction {
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            Self::Miss(_) => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Value(v) => Some(v),
            Self::Miss(_) => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_))
    }
}

impl CompiledXPath {
    pub fn evaluate(&self, doc: &Document) -> Result<XPathValue, EvalError> {
        evaluator::evaluate(self, doc)
    }

    /// Evaluate from the document root and convert the result with
    /// `string()`. A node-set yields the string-value of its first node; an
    /// empty node-set is a miss. Atomic results, including the empty string,
    /// are values.
    pub fn extract(&self, doc: &Document) -> Extraction {
        match self.evaluate(doc) {
            Ok(XPathValue::NodeSet(nodes)) => match nodes.first() {
                Some(&first) => Extraction::Value(doc.string_value(first)),
                None => Extraction::Miss(MissReason::EmptyNodeSet),
            },
            Ok(other) => Extraction::Value(other.to_xpath_string(doc)),
            Err(err) => Extraction::Miss(MissReason::Evaluation(err)),
        }
    }
}
