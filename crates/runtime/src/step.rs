use std::fmt;
use thiserror::Error;
use tracing::debug;
use wrangler_core::{
    Arguments, Directive, DirectiveExecutionError, DirectiveParseError, ExecutorContext, Row, UsageDefinition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Uninitialized,
    Ready,
    Executing,
    Destroyed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Executing => "executing",
            Self::Destroyed => "destroyed",
        })
    }
}

/// An operation was requested in a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} '{directive}' while it is {state}")]
pub struct LifecycleError {
    pub directive: &'static str,
    pub operation: &'static str,
    pub state: StepState,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Parse(#[from] DirectiveParseError),
    #[error(transparent)]
    Execution(#[from] DirectiveExecutionError),
}

/// Drives one directive through `Uninitialized → Ready ⇄ Executing → Destroyed`.
///
/// A failed `initialize` leaves the step `Uninitialized`. Dropping a step
/// destroys it.
pub struct Step {
    directive: Box<dyn Directive>,
    state: StepState,
}

impl Step {
    pub fn new(directive: Box<dyn Directive>) -> Self {
        Self { directive, state: StepState::Uninitialized }
    }

    pub fn name(&self) -> &'static str {
        self.directive.name()
    }

    pub fn description(&self) -> &'static str {
        self.directive.description()
    }

    pub fn definition(&self) -> UsageDefinition {
        self.directive.define()
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn initialize(&mut self, arguments: &Arguments) -> Result<(), StepError> {
        self.require(StepState::Uninitialized, "initialize")?;
        self.directive.initialize(arguments)?;
        self.transition(StepState::Ready);
        Ok(())
    }

    pub fn execute(&mut self, rows: &mut [Row], ctx: &ExecutorContext) -> Result<(), StepError> {
        self.require(StepState::Ready, "execute")?;
        self.transition(StepState::Executing);
        let result = self.directive.execute(rows, ctx);
        self.transition(StepState::Ready);
        result.map_err(StepError::from)
    }

    /// Idempotent.
    pub fn destroy(&mut self) {
        if self.state == StepState::Destroyed {
            return;
        }
        self.directive.destroy();
        self.transition(StepState::Destroyed);
    }

    fn require(&self, state: StepState, operation: &'static str) -> Result<(), LifecycleError> {
        if self.state == state {
            Ok(())
        } else {
            Err(LifecycleError { directive: self.name(), operation, state: self.state })
        }
    }

    fn transition(&mut self, to: StepState) {
        debug!(directive = self.name(), from = %self.state, to = %to, "step state changed");
        self.state = to;
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("directive", &self.name()).field("state", &self.state).finish()
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        self.destroy();
    }
}
