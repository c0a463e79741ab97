mod active;
mod workflow;

// Public API of the live session subsystem.
pub use crate::error::SessionError;
pub use active::{ActiveSession, SessionSource};
pub use workflow::SessionWorkflow;
