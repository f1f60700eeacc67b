use thiserror::Error;

/// Pre-flight reasons a skill cannot run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkillValidationError {
    #[error("skill has no instructions configured")]
    MissingInstructions,

    #[error("skill is inactive; activate it before running")]
    Inactive,
}

/// Malformed execution options. The only error `execute` surfaces to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors resolving a tool allow-list against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown tool names: {}", .0.join(", "))]
    UnknownTools(Vec<String>),
}

/// Errors from repository operations (used by trait definitions in nirvania-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_lists_names() {
        let err = RegistryError::UnknownTools(vec!["fly".to_string(), "teleport".to_string()]);
        assert_eq!(err.to_string(), "unknown tool names: fly, teleport");
    }

    #[test]
    fn test_options_error_wraps_registry() {
        let err: OptionsError = RegistryError::UnknownTools(vec!["x".to_string()]).into();
        assert!(err.to_string().contains("x"));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
