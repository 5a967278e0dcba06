use crate::invocation::parse_invocation;
use crate::step::{Step, StepError};
use thiserror::Error;
use tracing::trace;
use wrangler_core::{Directive, ExecutorContext, Row};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {index} ('{directive}') failed: {source}")]
pub struct PipelineError {
    pub index: usize,
    pub directive: &'static str,
    pub source: StepError,
}

/// Ordered list of initialized steps applied to each batch.
#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `invocation` against the directive's definition, initializes
    /// it and appends it. Nothing is appended on failure.
    pub fn add(&mut self, directive: Box<dyn Directive>, invocation: &str) -> Result<(), PipelineError> {
        let index = self.steps.len();
        let mut step = Step::new(directive);
        let fail = |step: &Step, source: StepError| PipelineError { index, directive: step.name(), source };
        let arguments = parse_invocation(invocation, &step.definition()).map_err(|e| fail(&step, e.into()))?;
        step.initialize(&arguments).map_err(|e| fail(&step, e))?;
        self.steps.push(step);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    /// Runs every step over `rows` in order, stopping at the first failure.
    /// Changes made before the failure stay in `rows`.
    pub fn execute(&mut self, rows: &mut [Row], ctx: &ExecutorContext) -> Result<(), PipelineError> {
        trace!(rows = rows.len(), steps = self.steps.len(), "executing batch");
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.execute(rows, ctx).map_err(|source| PipelineError { index, directive: step.name(), source })?;
        }
        Ok(())
    }

    pub fn destroy(&mut self) {
        for step in &mut self.steps {
            step.destroy();
        }
    }
}
