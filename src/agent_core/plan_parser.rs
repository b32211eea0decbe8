//! Action plan extraction from tagged model output.
//!
//! The model is prompted to answer with:
//!
//! ```text
//! <plan>
//!   <goal>Clean up the Downloads folder</goal>
//!   <step>List every file in ~/Downloads</step>
//!   <step>Move the PDFs into ~/Documents/PDFs</step>
//! </plan>
//! ```
//!
//! Anything else (no block, no goal, no usable steps, truncated tags) yields
//! `None`, which the executor treats exactly like the model choosing not to
//! plan. At most [`MAX_PLAN_STEPS`] steps are kept; blank steps are dropped
//! without counting toward the cap and the survivors are renumbered from 1.

use std::sync::OnceLock;

use regex::Regex;

use super::types::{ActionItem, ActionPlan};

/// Upper bound on steps handed to the executor.
pub const MAX_PLAN_STEPS: usize = 5;

struct PlanPatterns {
    block: Regex,
    goal: Regex,
    step: Regex,
}

fn patterns() -> &'static PlanPatterns {
    static PATTERNS: OnceLock<PlanPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PlanPatterns {
        block: Regex::new(r"(?si)<plan(?:\s[^>]*)?>(.*?)</plan>").expect("valid plan regex"),
        goal: Regex::new(r"(?si)<goal(?:\s[^>]*)?>(.*?)</goal>").expect("valid goal regex"),
        step: Regex::new(r"(?si)<step(?:\s[^>]*)?>(.*?)</step>").expect("valid step regex"),
    })
}

/// Parse a plan out of normalized model output.
pub fn parse_action_plan(text: &str) -> Option<ActionPlan> {
    if text.trim().is_empty() {
        return None;
    }

    let patterns = patterns();

    let block = patterns.block.captures(text)?.get(1)?.as_str();

    let goal = patterns.goal.captures(block)?.get(1)?.as_str().trim();
    if goal.is_empty() {
        return None;
    }

    let raw_steps: Vec<&str> = patterns
        .step
        .captures_iter(block)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if raw_steps.is_empty() {
        return None;
    }

    let steps: Vec<ActionItem> = raw_steps
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(MAX_PLAN_STEPS)
        .enumerate()
        .map(|(i, description)| ActionItem::pending(i as u32 + 1, description))
        .collect();

    if steps.is_empty() {
        tracing::debug!(
            raw_steps = raw_steps.len(),
            "plan block contained only blank steps"
        );
        return None;
    }

    if raw_steps.len() > steps.len() {
        tracing::debug!(
            raw_steps = raw_steps.len(),
            kept = steps.len(),
            "plan steps dropped (blank or over cap)"
        );
    }

    Some(ActionPlan {
        goal: goal.to_string(),
        steps,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::ActionStatus;

    fn block(goal: &str, steps: &[&str]) -> String {
        let mut text = format!("<plan>\n<goal>{goal}</goal>\n");
        for s in steps {
            text.push_str(&format!("<step>{s}</step>\n"));
        }
        text.push_str("</plan>");
        text
    }

    #[test]
    fn parse_simple_plan() {
        let plan = parse_action_plan(&block("Tidy up", &["List files", "Move PDFs"])).unwrap();
        assert_eq!(plan.goal, "Tidy up");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].step_number, 1);
        assert_eq!(plan.steps[1].description, "Move PDFs");
        assert!(plan.steps.iter().all(|s| s.status == ActionStatus::Pending));
    }

    #[test]
    fn caps_at_five_steps_in_source_order() {
        let steps = ["one", "two", "three", "four", "five", "six", "seven"];
        let plan = parse_action_plan(&block("Help the user", &steps)).unwrap();
        assert_eq!(plan.goal, "Help the user");
        assert_eq!(plan.steps.len(), 5);
        let numbers: Vec<u32> = plan.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        let descriptions: Vec<&str> = plan.steps.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["one", "two", "three", "four", "five"]);
    }

    #[test]
    fn blank_steps_are_dropped_and_renumbered() {
        let plan = parse_action_plan(&block("Goal", &["first", "   ", "third"])).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].step_number, 1);
        assert_eq!(plan.steps[1].step_number, 2);
        assert_eq!(plan.steps[1].description, "third");
    }

    #[test]
    fn blank_steps_do_not_count_toward_cap() {
        let steps = ["", "a", "", "b", "c", "d", "e", "f"];
        let plan = parse_action_plan(&block("Goal", &steps)).unwrap();
        let descriptions: Vec<&str> = plan.steps.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn trims_goal_and_steps() {
        let plan = parse_action_plan(&block("  Goal \n", &["\n  step one  \n"])).unwrap();
        assert_eq!(plan.goal, "Goal");
        assert_eq!(plan.steps[0].description, "step one");
    }

    #[test]
    fn surrounding_text_is_ignored() {
        let text = format!("Sure, here is what I'll do.\n{}\nLet me start.", block("G", &["s"]));
        assert!(parse_action_plan(&text).is_some());
    }

    #[test]
    fn tags_are_case_insensitive_and_accept_attributes() {
        let text = "<PLAN><Goal>G</Goal><step n=\"1\">do it</step></PLAN>";
        let plan = parse_action_plan(text).unwrap();
        assert_eq!(plan.steps[0].description, "do it");
    }

    #[test]
    fn none_for_empty_input() {
        assert!(parse_action_plan("").is_none());
        assert!(parse_action_plan("   \n").is_none());
    }

    #[test]
    fn none_without_outer_block() {
        assert!(parse_action_plan("<goal>G</goal><step>s</step>").is_none());
    }

    #[test]
    fn none_for_truncated_block() {
        assert!(parse_action_plan("<plan><goal>G</goal><step>s</step>").is_none());
    }

    #[test]
    fn none_for_missing_or_blank_goal() {
        assert!(parse_action_plan("<plan><step>s</step></plan>").is_none());
        assert!(parse_action_plan("<plan><goal>  </goal><step>s</step></plan>").is_none());
    }

    #[test]
    fn none_without_steps() {
        assert!(parse_action_plan("<plan><goal>G</goal></plan>").is_none());
    }

    #[test]
    fn none_when_all_steps_blank() {
        assert!(parse_action_plan(&block("G", &["", "  ", "\n"])).is_none());
    }

    #[test]
    fn duplicate_steps_are_kept() {
        let plan = parse_action_plan(&block("G", &["retry", "retry"])).unwrap();
        assert_eq!(plan.steps.len(), 2);
    }
}
