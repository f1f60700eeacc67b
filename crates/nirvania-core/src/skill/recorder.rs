//! RunRecorder trait -- persistence port for skill runs and counters.
//!
//! The engine never persists anything. Callers record a run before
//! execution starts and fold the terminal result in afterwards; the
//! recorder is the only writer of skill counters.

use uuid::Uuid;

use nirvania_types::error::RepositoryError;
use nirvania_types::execution::ExecutionResult;
use nirvania_types::skill::{SkillCounters, SkillId, SkillRun};

/// Storage for run records and per-skill counters.
///
/// Implementations live in nirvania-infra (e.g., `SqliteRunRecorder`).
pub trait RunRecorder: Send + Sync {
    /// Create a `running` record for a run about to start.
    fn start_run(
        &self,
        skill_id: &SkillId,
        input: &str,
        test_mode: bool,
    ) -> impl std::future::Future<Output = Result<SkillRun, RepositoryError>> + Send;

    /// Store the terminal result and roll it into the skill's counters.
    ///
    /// `total_runs` always increments, plus the one outcome counter matching
    /// `result.status` (see [`SkillCounters::apply`]).
    fn finish_run(
        &self,
        run_id: &Uuid,
        result: &ExecutionResult,
    ) -> impl std::future::Future<Output = Result<SkillRun, RepositoryError>> + Send;

    fn get_run(
        &self,
        run_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SkillRun>, RepositoryError>> + Send;

    /// Most recent runs first.
    fn list_runs(
        &self,
        skill_id: &SkillId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<SkillRun>, RepositoryError>> + Send;

    /// Counters for a skill; all zero when it has never run.
    fn counters(
        &self,
        skill_id: &SkillId,
    ) -> impl std::future::Future<Output = Result<SkillCounters, RepositoryError>> + Send;
}
