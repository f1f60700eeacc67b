//! Application state wiring the engine to its concrete adapters.
//!
//! The engine and runner are generic over provider/gateway/recorder ports;
//! AppState pins them to the infra implementations used by the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use nirvania_core::llm::reasoning::LlmReasoningProvider;
use nirvania_core::skill::engine::SkillExecutionEngine;
use nirvania_core::skill::runner::SkillRunner;
use nirvania_core::tool::registry::ToolRegistry;
use nirvania_infra::config::{anthropic_api_key, load_global_config, resolve_data_dir};
use nirvania_infra::gateway::InMemoryCrmGateway;
use nirvania_infra::llm::create_reasoning_provider;
use nirvania_infra::sqlite::pool::open_database;
use nirvania_infra::sqlite::skill_run::SqliteRunRecorder;
use nirvania_types::config::GlobalConfig;

/// Runner pinned to the infra implementations.
pub type ConcreteRunner =
    SkillRunner<LlmReasoningProvider, InMemoryCrmGateway, SqliteRunRecorder>;

/// Shared state for CLI commands.
///
/// Opening the database is cheap; building the reasoning provider needs an
/// API key, so it happens only when a command actually runs a skill.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: GlobalConfig,
    pub recorder: Arc<SqliteRunRecorder>,
}

impl AppState {
    /// Resolve the data directory, load `config.toml` and open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        let db_pool = open_database(&data_dir).await?;
        let recorder = Arc::new(SqliteRunRecorder::new(db_pool));

        Ok(Self {
            data_dir,
            config,
            recorder,
        })
    }

    /// Wire a runner: Anthropic reasoning, in-memory CRM, SQLite recording.
    pub fn runner(&self) -> anyhow::Result<ConcreteRunner> {
        let provider = create_reasoning_provider(&self.config, anthropic_api_key())
            .context("set ANTHROPIC_API_KEY to run skills")?;
        let engine = SkillExecutionEngine::new(
            Arc::new(provider),
            Arc::new(ToolRegistry::new(InMemoryCrmGateway::with_demo_data())),
        );
        Ok(SkillRunner::new(engine, Arc::clone(&self.recorder)))
    }
}
