pub mod arguments;
pub mod directive;
pub mod error;
pub mod row;
pub mod usage;

pub use arguments::{Arguments, ArgumentsBuilder, Token};
pub use directive::{Directive, ExecutorContext};
pub use error::{DirectiveExecutionError, DirectiveParseError};
pub use row::{Row, Scalar, Value};
pub use usage::{ParameterDefinition, TokenType, UsageDefinition, UsageDefinitionBuilder};
