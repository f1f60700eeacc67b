//! SkillRunner -- the caller side of a skill run.
//!
//! Composes the engine with a [`RunRecorder`]: validate, open a run record,
//! execute, then close the record and update counters. A skill that fails
//! validation or a malformed request never creates a run record.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use nirvania_types::error::{OptionsError, RepositoryError};
use nirvania_types::execution::{ExecutionOptions, ExecutionResult};
use nirvania_types::skill::Skill;

use crate::llm::reasoning::ReasoningProvider;
use crate::tool::gateway::CrmGateway;

use super::engine::SkillExecutionEngine;
use super::recorder::RunRecorder;

/// Why a run was refused or could not be recorded.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("input is required")]
    EmptyInput,

    #[error("skill is invalid: {}", .0.join("; "))]
    InvalidSkill(Vec<String>),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("failed to record run: {0}")]
    Repository(#[from] RepositoryError),

    /// The skill ran to completion but closing its run record failed.
    /// Side effects may already have happened, so the result is kept.
    #[error("run {run_id} finished but could not be recorded: {source}")]
    Unrecorded {
        run_id: Uuid,
        result: Box<ExecutionResult>,
        #[source]
        source: RepositoryError,
    },
}

/// A recorded run and its terminal result.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub result: ExecutionResult,
}

pub struct SkillRunner<P, G, R> {
    engine: SkillExecutionEngine<P, G>,
    recorder: Arc<R>,
}

impl<P: ReasoningProvider, G: CrmGateway, R: RunRecorder> SkillRunner<P, G, R> {
    pub fn new(engine: SkillExecutionEngine<P, G>, recorder: Arc<R>) -> Self {
        Self { engine, recorder }
    }

    pub fn engine(&self) -> &SkillExecutionEngine<P, G> {
        &self.engine
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub async fn run(
        &self,
        skill: &Skill,
        input: &str,
        options: &ExecutionOptions,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        if input.trim().is_empty() {
            return Err(RunError::EmptyInput);
        }

        let report = self.engine.validate_skill(skill);
        if !report.valid {
            return Err(RunError::InvalidSkill(report.errors));
        }
        self.engine.check_options(skill, options)?;

        let run = self
            .recorder
            .start_run(&skill.id, input, options.test_mode)
            .await?;
        info!(run_id = %run.id, skill.id = %skill.id, "Skill run started");

        let result = match self
            .engine
            .execute_with_cancel(skill, input, options, cancel)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // Options were checked above; close the record rather than leave it running.
                warn!(run_id = %run.id, error = %e, "Execution refused after run was recorded");
                let result = ExecutionResult::rejected(&[e.to_string()]);
                self.recorder.finish_run(&run.id, &result).await?;
                return Err(e.into());
            }
        };

        if let Err(source) = self.recorder.finish_run(&run.id, &result).await {
            warn!(run_id = %run.id, error = %source, "Failed to record finished run");
            return Err(RunError::Unrecorded {
                run_id: run.id,
                result: Box::new(result),
                source,
            });
        }
        info!(
            run_id = %run.id,
            status = %result.status,
            duration_ms = result.duration_ms,
            "Skill run recorded"
        );

        Ok(RunOutcome {
            run_id: run.id,
            result,
        })
    }
}
