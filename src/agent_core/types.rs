//! Action plan types shared with the external step executor.
//!
//! A plan is produced once by the extractor with every step `Pending`; the
//! executor then drives each step through `Running` to a terminal state.
//! `result` is only ever set on `Complete` and `error` only on `Failed`.

use serde::{Deserialize, Serialize};

use super::errors::PlanError;

/// Execution state of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Skipped,
}

impl ActionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionStatus::Complete | ActionStatus::Failed | ActionStatus::Skipped
        )
    }
}

/// One step of an [`ActionPlan`]. Step numbers start at 1 and are contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub step_number: u32,
    pub description: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionItem {
    pub fn pending(step_number: u32, description: impl Into<String>) -> Self {
        Self {
            step_number,
            description: description.into(),
            status: ActionStatus::Pending,
            result: None,
            error: None,
        }
    }

    /// Pending → Running.
    pub fn start(&mut self) -> Result<(), PlanError> {
        self.transition(ActionStatus::Pending, ActionStatus::Running)
    }

    /// Running → Complete, recording the step output.
    pub fn complete(&mut self, result: impl Into<String>) -> Result<(), PlanError> {
        self.transition(ActionStatus::Running, ActionStatus::Complete)?;
        self.result = Some(result.into());
        Ok(())
    }

    /// Running → Failed, recording the failure.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), PlanError> {
        self.transition(ActionStatus::Running, ActionStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Pending or Running → Skipped.
    pub fn skip(&mut self) -> Result<(), PlanError> {
        if self.status.is_terminal() {
            return Err(self.invalid(ActionStatus::Skipped));
        }
        self.status = ActionStatus::Skipped;
        Ok(())
    }

    fn transition(&mut self, from: ActionStatus, to: ActionStatus) -> Result<(), PlanError> {
        if self.status != from {
            return Err(self.invalid(to));
        }
        self.status = to;
        Ok(())
    }

    fn invalid(&self, to: ActionStatus) -> PlanError {
        PlanError::InvalidTransition {
            step_number: self.step_number,
            from: self.status,
            to,
        }
    }
}

/// A goal plus an ordered, capped list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub goal: String,
    pub steps: Vec<ActionItem>,
}

impl ActionPlan {
    /// First step still waiting to run.
    pub fn next_pending(&self) -> Option<&ActionItem> {
        self.steps
            .iter()
            .find(|s| s.status == ActionStatus::Pending)
    }

    pub fn step_mut(&mut self, step_number: u32) -> Option<&mut ActionItem> {
        self.steps.iter_mut().find(|s| s.step_number == step_number)
    }

    /// True once every step has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
