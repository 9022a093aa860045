//! Transition rules for the four status-carrying entities.
//!
//! Every function here is a pure guard over (role, current status, field
//! completeness). Illegal transitions fail with a [`WorkflowError`] carrying
//! a user-visible message before anything touches the store; there are no
//! silent no-ops.

mod memo;
mod rab;
mod realization;
mod report;

pub use memo::*;
pub use rab::*;
pub use realization::*;
pub use report::*;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("cannot {action} a {entity} while it is {status}")]
    InvalidTransition {
        entity: &'static str,
        action: &'static str,
        status: &'static str,
    },
    /// Surfaced to clients without detail about which guard failed.
    #[error("permission denied")]
    Forbidden,
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
