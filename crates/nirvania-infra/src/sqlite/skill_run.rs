//! SQLite run recorder.
//!
//! Implements `RunRecorder` from `nirvania-core`. Logs, tools used and
//! tool-call records are stored as JSON text columns. Finishing a run updates
//! the run row and the skill's counters in one transaction.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use nirvania_core::skill::recorder::RunRecorder;
use nirvania_types::error::RepositoryError;
use nirvania_types::execution::ExecutionResult;
use nirvania_types::skill::{SkillCounters, SkillId, SkillRun, SkillRunStatus};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `RunRecorder`.
pub struct SqliteRunRecorder {
    pool: DatabasePool,
}

impl SqliteRunRecorder {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to a domain `SkillRun`.
struct RunRow {
    id: String,
    skill_id: String,
    status: String,
    input: String,
    test_mode: bool,
    output: Option<String>,
    error: Option<String>,
    logs: String,
    tools_used: String,
    tool_calls: String,
    started_at: String,
    completed_at: Option<String>,
    duration_ms: Option<i64>,
}

impl RunRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            skill_id: row.try_get("skill_id")?,
            status: row.try_get("status")?,
            input: row.try_get("input")?,
            test_mode: row.try_get("test_mode")?,
            output: row.try_get("output")?,
            error: row.try_get("error")?,
            logs: row.try_get("logs")?,
            tools_used: row.try_get("tools_used")?,
            tool_calls: row.try_get("tool_calls")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            duration_ms: row.try_get("duration_ms")?,
        })
    }

    fn into_run(self) -> Result<SkillRun, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid run id: {e}")))?;
        let skill_id = self
            .skill_id
            .parse::<SkillId>()
            .map_err(|e| RepositoryError::Query(format!("invalid skill id: {e}")))?;
        let status: SkillRunStatus = self.status.parse().map_err(RepositoryError::Query)?;

        Ok(SkillRun {
            id,
            skill_id,
            status,
            input: self.input,
            test_mode: self.test_mode,
            output: self.output,
            error: self.error,
            logs: from_json(&self.logs, "logs")?,
            tools_used: from_json(&self.tools_used, "tools_used")?,
            tool_calls: from_json(&self.tool_calls, "tool_calls")?,
            started_at: parse_datetime(&self.started_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            duration_ms: self.duration_ms.map(|ms| ms.max(0) as u64),
        })
    }
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str, column: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Query(format!("invalid {column} JSON: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(e.to_string()))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

impl RunRecorder for SqliteRunRecorder {
    async fn start_run(
        &self,
        skill_id: &SkillId,
        input: &str,
        test_mode: bool,
    ) -> Result<SkillRun, RepositoryError> {
        let run = SkillRun::started(*skill_id, input, test_mode);

        sqlx::query(
            "INSERT INTO skill_runs (id, skill_id, status, input, test_mode, started_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(run.id.to_string())
        .bind(run.skill_id.to_string())
        .bind(run.status.to_string())
        .bind(&run.input)
        .bind(run.test_mode)
        .bind(format_datetime(&run.started_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(run)
    }

    async fn finish_run(
        &self,
        run_id: &Uuid,
        result: &ExecutionResult,
    ) -> Result<SkillRun, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let row = sqlx::query("SELECT * FROM skill_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_err)?
            .ok_or(RepositoryError::NotFound)?;
        let mut run = RunRow::from_row(&row).map_err(query_err)?.into_run()?;

        if run.completed_at.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "run {run_id} is already finished"
            )));
        }
        run.complete(result);

        sqlx::query(
            "UPDATE skill_runs
             SET status = ?, output = ?, error = ?, logs = ?, tools_used = ?, tool_calls = ?,
                 completed_at = ?, duration_ms = ?
             WHERE id = ?",
        )
        .bind(run.status.to_string())
        .bind(&run.output)
        .bind(&run.error)
        .bind(to_json(&run.logs)?)
        .bind(to_json(&run.tools_used)?)
        .bind(to_json(&run.tool_calls)?)
        .bind(run.completed_at.as_ref().map(format_datetime))
        .bind(run.duration_ms.map(|ms| ms as i64))
        .bind(run.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        let mut delta = SkillCounters::default();
        delta.apply(result.status);

        sqlx::query(
            "INSERT INTO skill_counters (skill_id, total_runs, succeeded, errors, exited, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(skill_id) DO UPDATE SET
                 total_runs = total_runs + excluded.total_runs,
                 succeeded = succeeded + excluded.succeeded,
                 errors = errors + excluded.errors,
                 exited = exited + excluded.exited,
                 updated_at = excluded.updated_at",
        )
        .bind(run.skill_id.to_string())
        .bind(delta.total_runs as i64)
        .bind(delta.succeeded as i64)
        .bind(delta.errors as i64)
        .bind(delta.exited as i64)
        .bind(format_datetime(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        tracing::debug!(run_id = %run.id, status = %run.status, "Run finished and counters updated");
        Ok(run)
    }

    async fn get_run(&self, run_id: &Uuid) -> Result<Option<SkillRun>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM skill_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.map(|r| RunRow::from_row(&r).map_err(query_err)?.into_run())
            .transpose()
    }

    async fn list_runs(
        &self,
        skill_id: &SkillId,
        limit: u32,
    ) -> Result<Vec<SkillRun>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM skill_runs WHERE skill_id = ? ORDER BY started_at DESC, id DESC LIMIT ?",
        )
        .bind(skill_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|r| RunRow::from_row(r).map_err(query_err)?.into_run())
            .collect()
    }

    async fn counters(&self, skill_id: &SkillId) -> Result<SkillCounters, RepositoryError> {
        let row = sqlx::query(
            "SELECT total_runs, succeeded, errors, exited, in_progress
             FROM skill_counters WHERE skill_id = ?",
        )
        .bind(skill_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(SkillCounters::default());
        };

        let get = |column: &str| -> Result<u64, RepositoryError> {
            let value: i64 = row.try_get(column).map_err(query_err)?;
            Ok(value.max(0) as u64)
        };

        Ok(SkillCounters {
            total_runs: get("total_runs")?,
            succeeded: get("succeeded")?,
            errors: get("errors")?,
            exited: get("exited")?,
            in_progress: get("in_progress")?,
        })
    }
}
