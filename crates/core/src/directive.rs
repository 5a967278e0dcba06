use crate::arguments::Arguments;
use crate::error::{DirectiveExecutionError, DirectiveParseError};
use crate::row::Row;
use crate::usage::UsageDefinition;

/// Per-execution information handed to every directive. Directives may
/// ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorContext {
    pipeline: Option<String>,
}

impl ExecutorContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pipeline(mut self, name: impl Into<String>) -> Self {
        self.pipeline = Some(name.into());
        self
    }

    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }
}

/// A single transformation step of a pipeline.
///
/// The runtime calls [`Directive::initialize`] once with arguments matching
/// [`Directive::define`], then [`Directive::execute`] once per batch, then
/// [`Directive::destroy`]. Rows are edited in place; a batch never gains or
/// loses rows.
pub trait Directive: Send {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn define(&self) -> UsageDefinition;
    fn initialize(&mut self, arguments: &Arguments) -> Result<(), DirectiveParseError>;

    /// Process one batch. On error, rows before the failing one may already
    /// have been modified.
    fn execute(&mut self, rows: &mut [Row], ctx: &ExecutorContext) -> Result<(), DirectiveExecutionError>;

    /// Release resources held since `initialize`. Called at most once by the
    /// runtime; the default does nothing.
    fn destroy(&mut self) {}
}
