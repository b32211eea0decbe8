//! System prompt composition from a base prompt and active skills.
//!
//! Skills are appended in the order the caller supplies them (typically
//! install order). The composer neither sorts nor deduplicates.

use serde::{Deserialize, Serialize};

/// Header that introduces the skill section.
pub const SKILLS_SECTION_HEADER: &str = "## Active Skills";

/// A named, versioned prompt fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub version: String,
    /// Prompt text contributed when the skill is active.
    #[serde(default)]
    pub template: String,
}

impl Skill {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            template: template.into(),
        }
    }
}

/// Build the system prompt for a session.
///
/// With no active skills this is the base prompt with trailing whitespace
/// removed. Otherwise the skill section follows, one labeled block per skill
/// whose template is not blank.
pub fn compose_system_prompt(base_prompt: &str, active_skills: &[Skill]) -> String {
    let mut prompt = base_prompt.trim_end().to_string();
    if active_skills.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\n");
    prompt.push_str(SKILLS_SECTION_HEADER);

    for skill in active_skills {
        let template = skill.template.trim();
        if template.is_empty() {
            continue;
        }
        prompt.push_str(&format!(
            "\n\n### {} (v{})\n{}",
            skill.name, skill.version, template
        ));
    }

    prompt
}

// ─── Tests ──────────────────────────────────────────────────────────────────
