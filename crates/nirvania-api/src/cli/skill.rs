//! CLI skill subcommands: validate, run, runs and stats.
//!
//! Skills are authored as TOML files deserializing into [`Skill`]. Give the
//! file a fixed `id` to keep run history and counters attached to it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, field, info_span};

use nirvania_core::skill::recorder::RunRecorder;
use nirvania_core::skill::runner::{RunError, RunOutcome};
use nirvania_core::skill::validation::validate_skill;
use nirvania_observe::genai_attrs;
use nirvania_types::config::GlobalConfig;
use nirvania_types::execution::{
    ExecutionOptions, ExecutionResult, ExecutionStatus, LogEntry, LogLevel,
};
use nirvania_types::skill::{Skill, SkillId, SkillRun, SkillRunStatus};

use crate::state::AppState;

/// Skill subcommands.
#[derive(Subcommand)]
pub enum SkillCommand {
    /// Check a skill file without running it.
    Validate {
        /// Path to the skill TOML file.
        file: PathBuf,
    },

    /// Run a skill against one input and record the run.
    Run {
        /// Path to the skill TOML file.
        file: PathBuf,

        /// The request the skill should handle.
        #[arg(long)]
        input: String,

        /// Perform mutating tool calls for real (default simulates them).
        #[arg(long)]
        live: bool,

        /// Skip the manual-approval gate for this run.
        #[arg(long)]
        approved: bool,

        /// Offer only these tools (comma-separated).
        #[arg(long, value_delimiter = ',')]
        tools: Vec<String>,

        /// Reasoning iteration budget (defaults to config.toml).
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Wall-clock budget in seconds (defaults to config.toml).
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Dispatch the tool calls of one step concurrently.
        #[arg(long)]
        parallel: bool,
    },

    /// List recent runs of a skill, newest first.
    Runs {
        /// Skill ID.
        skill_id: SkillId,

        /// Maximum number of runs to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show run counters for a skill.
    Stats {
        /// Skill ID.
        skill_id: SkillId,
    },
}

/// Handle a skill subcommand.
pub async fn handle_skill_command(action: SkillCommand, json: bool) -> Result<()> {
    match action {
        SkillCommand::Validate { file } => validate(&file, json).await,
        SkillCommand::Run {
            file,
            input,
            live,
            approved,
            tools,
            max_iterations,
            timeout_secs,
            parallel,
        } => {
            let state = AppState::init().await?;
            let skill = load_skill(&file).await?;
            let options = build_options(
                &state.config,
                RunFlags {
                    live,
                    approved,
                    tools,
                    max_iterations,
                    timeout_secs,
                    parallel,
                },
            );
            run(&state, &skill, &input, &options, json).await
        }
        SkillCommand::Runs { skill_id, limit } => {
            let state = AppState::init().await?;
            list_runs(&state, &skill_id, limit, json).await
        }
        SkillCommand::Stats { skill_id } => {
            let state = AppState::init().await?;
            stats(&state, &skill_id, json).await
        }
    }
}

/// Read and parse a skill TOML file.
pub async fn load_skill(path: &Path) -> Result<Skill> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read skill file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse skill file {}", path.display()))
}

/// Per-run flags from the command line.
pub struct RunFlags {
    pub live: bool,
    pub approved: bool,
    pub tools: Vec<String>,
    pub max_iterations: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub parallel: bool,
}

/// Merge command-line flags over the configured defaults.
pub fn build_options(config: &GlobalConfig, flags: RunFlags) -> ExecutionOptions {
    let mut options = ExecutionOptions::from_config(config).with_test_mode(!flags.live);

    if flags.approved {
        options = options.with_require_approval(false);
    }
    if !flags.tools.is_empty() {
        options = options.with_tool_names(flags.tools);
    }
    if let Some(n) = flags.max_iterations {
        options = options.with_max_iterations(n);
    }
    if let Some(secs) = flags.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    if flags.parallel {
        options = options.with_parallel_tool_calls(true);
    }

    options
}

async fn validate(file: &Path, json: bool) -> Result<()> {
    let skill = load_skill(file).await?;
    let report = validate_skill(&skill);

    if json {
        let out = serde_json::json!({
            "skill_id": skill.id.to_string(),
            "name": skill.name,
            "valid": report.valid,
            "errors": report.errors,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    if report.valid {
        println!(
            "  {} Skill '{}' is valid",
            style("✓").green().bold(),
            style(&skill.name).cyan()
        );
    } else {
        println!(
            "  {} Skill '{}' is invalid:",
            style("✗").red().bold(),
            style(&skill.name).cyan()
        );
        for error in &report.errors {
            println!("    - {error}");
        }
    }
    println!();
    Ok(())
}

async fn run(
    state: &AppState,
    skill: &Skill,
    input: &str,
    options: &ExecutionOptions,
    json: bool,
) -> Result<()> {
    let runner = state.runner()?;

    // Ctrl+C stops the run at its next suspension point; the run is still recorded.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let span = info_span!(
        "skill.run",
        skill.id = %skill.id,
        skill.name = %skill.name,
        skill.test_mode = options.test_mode,
        skill.run.id = field::Empty,
        skill.run.status = field::Empty,
        skill.run.duration_ms = field::Empty,
        skill.run.tools_used = field::Empty,
    );

    let outcome = runner
        .run(skill, input, options, cancel)
        .instrument(span.clone())
        .await;
    interrupt.abort();

    match outcome {
        Ok(outcome) => report(skill, &outcome, options, json, &span),
        Err(RunError::Unrecorded {
            run_id,
            result,
            source,
        }) => {
            // The run's effects are real even though its record is not.
            let outcome = RunOutcome {
                run_id,
                result: *result,
            };
            report(skill, &outcome, options, json, &span)?;
            Err(anyhow::Error::new(source)
                .context(format!("run {run_id} finished but could not be recorded")))
        }
        Err(e) => {
            Err(anyhow::Error::new(e).context(format!("skill '{}' did not run", skill.name)))
        }
    }
}

fn report(
    skill: &Skill,
    outcome: &RunOutcome,
    options: &ExecutionOptions,
    json: bool,
    span: &tracing::Span,
) -> Result<()> {
    span.record(genai_attrs::SKILL_RUN_ID, field::display(outcome.run_id));
    span.record(
        genai_attrs::SKILL_RUN_STATUS,
        field::display(outcome.result.status),
    );
    span.record(genai_attrs::SKILL_RUN_DURATION_MS, outcome.result.duration_ms);
    span.record(
        genai_attrs::SKILL_RUN_TOOLS_USED,
        outcome.result.tools_used.len() as u64,
    );

    if json {
        let out = serde_json::json!({
            "run_id": outcome.run_id,
            "skill_id": skill.id.to_string(),
            "result": outcome.result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_result(skill, &outcome.run_id.to_string(), &outcome.result, options);
    Ok(())
}

fn print_result(skill: &Skill, run_id: &str, result: &ExecutionResult, options: &ExecutionOptions) {
    println!();
    println!(
        "  {} {} {}",
        style("▶").bold(),
        style(&skill.name).cyan().bold(),
        if options.test_mode {
            style("(test mode)").dim().to_string()
        } else {
            style("(live)").yellow().to_string()
        }
    );
    println!("  Run:      {}", style(run_id).dim());
    println!("  Status:   {}", format_execution_status(result.status));
    println!("  Duration: {}ms", result.duration_ms);

    if !result.tools_used.is_empty() {
        let tools: Vec<&str> = result.tools_used.iter().map(String::as_str).collect();
        println!("  Tools:    {}", tools.join(", "));
    }

    if let Some(output) = &result.output {
        println!();
        println!("  {}", style("── Output ──").dim());
        for line in output.lines() {
            println!("  {line}");
        }
    }

    if let Some(error) = &result.error {
        println!();
        println!("  {} {}", style("Error:").red().bold(), error);
    }

    if !result.logs.is_empty() {
        println!();
        println!("  {}", style("── Log ──").dim());
        for entry in &result.logs {
            println!("  {}", format_log_entry(entry));
        }
    }
    println!();
}

async fn list_runs(state: &AppState, skill_id: &SkillId, limit: u32, json: bool) -> Result<()> {
    let runs = state
        .recorder
        .list_runs(skill_id, limit)
        .await
        .context("failed to list runs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!();
        println!("  No runs recorded for skill {skill_id}.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Run").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Mode").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Duration").fg(Color::White),
        Cell::new("Tools").fg(Color::White),
    ]);

    for run in &runs {
        table.add_row(vec![
            Cell::new(short_id(run)),
            run_status_cell(run.status),
            Cell::new(if run.test_mode { "test" } else { "live" }),
            Cell::new(run.started_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(
                run.duration_ms
                    .map(|ms| format!("{ms}ms"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(run.tools_used.join(", ")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn stats(state: &AppState, skill_id: &SkillId, json: bool) -> Result<()> {
    let counters = state
        .recorder
        .counters(skill_id)
        .await
        .context("failed to load skill counters")?;

    if json {
        let out = serde_json::json!({
            "skill_id": skill_id.to_string(),
            "counters": counters,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {} Skill {}", style("📊").bold(), style(skill_id).cyan());
    println!();
    println!("  Total runs: {}", style(counters.total_runs).bold());
    println!("  Succeeded:  {}", style(counters.succeeded).green());
    if counters.errors > 0 {
        println!("  Errors:     {}", style(counters.errors).red());
    }
    if counters.exited > 0 {
        println!("  Exited:     {}", style(counters.exited).yellow());
    }
    println!();
    println!(
        "  {}",
        style(format!("Data: {}", state.data_dir.display())).dim()
    );
    println!();
    Ok(())
}

fn short_id(run: &SkillRun) -> String {
    let id = run.id.to_string();
    id[id.len() - 12..].to_string()
}

fn format_execution_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Succeeded => format!("{}", style("● succeeded").green()),
        ExecutionStatus::Failed => format!("{}", style("✗ failed").red()),
        ExecutionStatus::Exited => format!("{}", style("◌ exited").yellow()),
        ExecutionStatus::PendingApproval => format!("{}", style("○ pending approval").cyan()),
    }
}

fn run_status_cell(status: SkillRunStatus) -> Cell {
    match status {
        SkillRunStatus::Succeeded => Cell::new("● succeeded").fg(Color::Green),
        SkillRunStatus::Failed => Cell::new("✗ failed").fg(Color::Red),
        SkillRunStatus::Exited => Cell::new("◌ exited").fg(Color::Yellow),
        SkillRunStatus::PendingApproval => Cell::new("○ pending approval").fg(Color::Cyan),
        SkillRunStatus::Running => Cell::new("… running").fg(Color::DarkGrey),
    }
}

fn format_log_entry(entry: &LogEntry) -> String {
    let time = entry.timestamp.format("%H:%M:%S%.3f");
    let level = match entry.level {
        LogLevel::Info => style("info ").blue(),
        LogLevel::Warn => style("warn ").yellow(),
        LogLevel::Error => style("error").red(),
    };
    format!("{} {} {}", style(time).dim(), level, entry.message)
}
