mod invocation;
pub mod pipeline;
pub mod step;

pub use invocation::parse_invocation;
pub use pipeline::{Pipeline, PipelineError};
pub use step::{LifecycleError, Step, StepError, StepState};
