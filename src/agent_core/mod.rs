//! Agent core: turns model output into work for the step executor.
//!
//! Submodules:
//! - `plan_parser`: tagged `<plan>` extraction with the 5-step cap
//! - `prompt`: system prompt composition from active skills
//! - `types`: `ActionPlan` / `ActionItem` and step transitions
//! - `errors`: plan error types

pub mod errors;
pub mod plan_parser;
pub mod prompt;
pub mod types;

// Re-exports for convenience
pub use errors::PlanError;
pub use plan_parser::{parse_action_plan, MAX_PLAN_STEPS};
pub use prompt::{compose_system_prompt, Skill};
pub use types::{ActionItem, ActionPlan, ActionStatus};
