pub mod compiler;
pub mod evaluator;
pub mod extract;
pub mod functions;
pub mod model;
pub mod parser;
pub mod runtime;
pub mod xdm;

pub use compiler::{CompiledXPath, compile_with_context, compile_xpath};
pub use evaluator::{evaluate, evaluate_from};
pub use extract::{Extraction, MissReason};
pub use model::{Document, DocumentParser, DocumentParserBuilder, NodeId, NodeKind, ParserConfigError, ParserOptions, XmlError, XmlName};
pub use parser::{XPathParser, parse_xpath};
pub use runtime::{EvalError, StaticContext, StaticContextBuilder, XPathError};
pub use xdm::XPathValue;
