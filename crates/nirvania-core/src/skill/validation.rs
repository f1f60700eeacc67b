//! Pre-flight skill validation.
//!
//! The engine runs the same checks inside `execute`, so the verdict here and
//! the engine's behaviour never diverge.

use serde::Serialize;

use nirvania_types::error::SkillValidationError;
use nirvania_types::skill::{Skill, SkillStatus};

/// Verdict of [`validate_skill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Every reason `skill` cannot run, in check order.
pub fn check_skill(skill: &Skill) -> Vec<SkillValidationError> {
    let mut errors = Vec::new();
    if skill.instructions.trim().is_empty() {
        errors.push(SkillValidationError::MissingInstructions);
    }
    if skill.status == SkillStatus::Inactive {
        errors.push(SkillValidationError::Inactive);
    }
    errors
}

/// Side-effect-free pre-check of whether `skill` can run.
pub fn validate_skill(skill: &Skill) -> ValidationReport {
    let errors: Vec<String> = check_skill(skill).iter().map(ToString::to_string).collect();
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
