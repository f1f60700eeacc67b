//! System prompt assembly for skill runs.
//!
//! Turns a skill definition and the run mode into the system instruction
//! block, using XML tag boundaries for section delineation.

use nirvania_types::skill::Skill;

const DEFAULT_ROLE: &str = "CRM Agent";

/// Builds the system prompt for one skill run.
///
/// Layout (conditional sections are omitted when the field is empty):
/// ```text
/// <role>...</role>
/// <goal>{goal}</goal>                        (conditional)
/// <instructions>{instructions}</instructions>
/// <restrictions>{restrictions}</restrictions> (conditional)
/// <memory>{memory}</memory>                  (conditional)
/// <test_mode>...</test_mode>                 (test mode only)
/// <general_rules>...</general_rules>
/// ```
pub struct PromptAssembler;

impl PromptAssembler {
    /// Deterministic: the same skill and mode always yield the same bytes.
    pub fn assemble(skill: &Skill, test_mode: bool) -> String {
        let mut sections = Vec::with_capacity(7);

        sections.push(Self::role_section(skill));

        if let Some(goal) = non_empty(skill.goal.as_deref()) {
            sections.push(format!("<goal>\n{goal}\n</goal>"));
        }

        sections.push(format!(
            "<instructions>\n{}\n</instructions>",
            skill.instructions.trim()
        ));

        if let Some(restrictions) = non_empty(skill.restrictions.as_deref()) {
            sections.push(format!("<restrictions>\n{restrictions}\n</restrictions>"));
        }

        if let Some(memory) = non_empty(skill.memory.as_deref()) {
            sections.push(format!(
                "<memory>\nContext to keep in mind:\n{memory}\n</memory>"
            ));
        }

        if test_mode {
            sections.push(
                "<test_mode>\n\
                TEST MODE IS ACTIVE.\n\
                - Do not send real emails.\n\
                - Do not modify any CRM data.\n\
                - Simulate every action; tools that change data will only simulate.\n\
                - State clearly in your final answer that this was a simulation.\n\
                </test_mode>"
                    .to_string(),
            );
        }

        sections.push(
            "<general_rules>\n\
            - Use the available tools to carry out the task.\n\
            - Be proactive but respectful.\n\
            - Personalize every message to the contact's context.\n\
            - Log every important activity.\n\
            - If you are unsure, ask before acting.\n\
            - Always respond in Spanish for Latin American users.\n\
            </general_rules>\n\n\
            Begin the analysis and execution."
                .to_string(),
        );

        sections.join("\n\n")
    }

    fn role_section(skill: &Skill) -> String {
        let (name, description) = match &skill.agent {
            Some(agent) => (
                non_empty(Some(agent.name.as_str())).unwrap_or(DEFAULT_ROLE),
                agent.description.trim(),
            ),
            None => (DEFAULT_ROLE, ""),
        };

        let description_line = if description.is_empty() {
            String::new()
        } else {
            format!("\nDescription: {description}")
        };

        format!(
            "<role>\n\
            You are an AI assistant specialized in CRM for companies in Latin America.\n\
            Your role: {name}{description_line}\n\
            </role>"
        )
    }
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nirvania_types::skill::{AgentProfile, AgentType};

    fn full_skill() -> Skill {
        let mut skill = Skill::new("Follow-up", "Email cold leads");
        skill.goal = Some("Re-engage leads".to_string());
        skill.restrictions = Some("At most 10 emails".to_string());
        skill.memory = Some("Q4 promo ends Dec 15".to_string());
        skill.agent = Some(AgentProfile {
            name: "Outbound Manager".to_string(),
            description: "Prospecting".to_string(),
            agent_type: AgentType::OutboundManager,
        });
        skill
    }

    fn tag_positions(prompt: &str, tags: &[&str]) -> Vec<usize> {
        tags.iter()
            .map(|tag| {
                prompt
                    .find(&format!("<{tag}>"))
                    .unwrap_or_else(|| panic!("missing <{tag}>"))
            })
            .collect()
    }

    #[test]
    fn test_full_section_order() {
        let prompt = PromptAssembler::assemble(&full_skill(), true);
        let tags = [
            "role",
            "goal",
            "instructions",
            "restrictions",
            "memory",
            "test_mode",
            "general_rules",
        ];
        let positions = tag_positions(&prompt, &tags);
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "sections out of order: {positions:?}"
        );
    }

    #[test]
    fn test_minimal_skill_sections() {
        let skill = Skill::new("Greeter", "Say hello");
        let prompt = PromptAssembler::assemble(&skill, false);

        let positions = tag_positions(&prompt, &["role", "instructions", "general_rules"]);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        for absent in ["<goal>", "<restrictions>", "<memory>", "<test_mode>"] {
            assert!(!prompt.contains(absent), "unexpected {absent}");
        }
        assert!(prompt.contains("Your role: CRM Agent"));
        assert!(!prompt.contains("Description:"));
    }

    #[test]
    fn test_whitespace_fields_are_omitted() {
        let mut skill = Skill::new("Greeter", "Say hello");
        skill.goal = Some("   ".to_string());
        skill.memory = Some(String::new());
        let prompt = PromptAssembler::assemble(&skill, false);
        assert!(!prompt.contains("<goal>"));
        assert!(!prompt.contains("<memory>"));
    }

    #[test]
    fn test_test_mode_notice_only_in_test_mode() {
        let skill = Skill::new("Greeter", "Say hello");
        assert!(PromptAssembler::assemble(&skill, true).contains("<test_mode>"));
        assert!(!PromptAssembler::assemble(&skill, false).contains("<test_mode>"));
    }

    #[test]
    fn test_assemble_is_byte_identical() {
        let skill = full_skill();
        assert_eq!(
            PromptAssembler::assemble(&skill, true),
            PromptAssembler::assemble(&skill, true)
        );
    }

    #[test]
    fn test_agent_role_and_description() {
        let prompt = PromptAssembler::assemble(&full_skill(), false);
        assert!(prompt.contains("Your role: Outbound Manager\nDescription: Prospecting"));
        assert!(prompt.starts_with("<role>"));
    }

    #[test]
    fn test_general_rules_pin_response_language() {
        let prompt = PromptAssembler::assemble(&Skill::new("Greeter", "Say hello"), false);
        let rules_start = prompt.find("<general_rules>").unwrap();
        let rules_end = prompt.find("</general_rules>").unwrap();
        let rules = &prompt[rules_start..rules_end];
        assert!(prompt.contains("companies in Latin America"));
        assert!(rules.contains("- Always respond in Spanish for Latin American users."));
    }
}
