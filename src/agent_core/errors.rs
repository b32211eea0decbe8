//! Agent Core error types.

use thiserror::Error;

use super::types::ActionStatus;

/// Errors raised while driving an action plan.
///
/// Plan extraction itself never fails: a missing or malformed plan is
/// reported as `None`, not as an error.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A step was asked to move to a state its current state cannot reach.
    #[error("step {step_number} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        step_number: u32,
        from: ActionStatus,
        to: ActionStatus,
    },
}
