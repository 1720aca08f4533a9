//! Job domain: record, state machine, failure taxonomy, progress events

pub mod failure;
pub mod progress;
pub mod record;
pub mod state;

pub use failure::{FailureKind, JobFailure};
pub use progress::ProgressEvent;
pub use record::{Job, JobId};
pub use state::{InvalidStateTransition, JobState, StepKind};
