//! Skill execution engine.
//!
//! `SkillExecutionEngine` runs one skill invocation to completion:
//! validate, assemble the system prompt, apply the approval gate, then
//! iterate between the reasoning provider and the tool registry until a
//! final answer, the iteration budget, the timeout, or cancellation.
//!
//! The engine holds only shared read-only handles. Every run gets a fresh
//! [`ExecutionLogger`] and run state, so concurrent runs are independent.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use nirvania_types::error::OptionsError;
use nirvania_types::execution::{
    ExecutionOptions, ExecutionResult, ExecutionStatus, ToolCallRecord,
};
use nirvania_types::llm::{LlmError, ToolDefinition};
use nirvania_types::reasoning::{
    ReasoningRequest, ReasoningStep, ReasoningTurn, ToolCallRequest, ToolExchange,
    ToolObservation,
};
use nirvania_types::skill::Skill;
use nirvania_types::tool::{ToolError, ToolName};

use crate::llm::reasoning::ReasoningProvider;
use crate::tool::catalog::ToolSpec;
use crate::tool::gateway::CrmGateway;
use crate::tool::registry::{ToolContext, ToolRegistry};

use super::logger::ExecutionLogger;
use super::prompt::PromptAssembler;
use super::validation::{ValidationReport, validate_skill};

/// How a run ended, before it is folded into an [`ExecutionResult`].
enum Outcome {
    Answered(String),
    PendingApproval,
    BudgetExhausted,
    ProviderFailed(LlmError),
    TimedOut,
    Cancelled,
}

/// Immutable inputs of the iterate phase.
struct RunPlan<'a> {
    system_prompt: String,
    input: &'a str,
    tools: Vec<ToolDefinition>,
    allowed: BTreeSet<ToolName>,
    tool_ctx: ToolContext,
    max_iterations: u32,
    parallel: bool,
}

/// Mutable per-run accumulators. Survives a timeout so partial telemetry is kept.
#[derive(Default)]
struct RunState {
    tools_used: BTreeSet<String>,
    tool_calls: Vec<ToolCallRecord>,
    history: Vec<ReasoningTurn>,
    /// Calls handed to the registry whose observation has not come back.
    in_flight: Vec<InFlightCall>,
}

struct InFlightCall {
    call_id: String,
    tool_name: String,
    input: String,
    started_at: DateTime<Utc>,
}

struct CallOutcome {
    record: ToolCallRecord,
    observation: ToolObservation,
    /// The call reached the registry (known and allowed tool).
    dispatched: bool,
}

/// Orchestrates skill runs over a reasoning provider and a tool registry.
pub struct SkillExecutionEngine<P, G> {
    provider: Arc<P>,
    registry: Arc<ToolRegistry<G>>,
}

impl<P, G> Clone for SkillExecutionEngine<P, G> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<P: ReasoningProvider, G: CrmGateway> SkillExecutionEngine<P, G> {
    pub fn new(provider: Arc<P>, registry: Arc<ToolRegistry<G>>) -> Self {
        Self { provider, registry }
    }

    pub fn registry(&self) -> &ToolRegistry<G> {
        &self.registry
    }

    /// Side-effect-free pre-check; `execute` applies exactly these checks.
    pub fn validate_skill(&self, skill: &Skill) -> ValidationReport {
        validate_skill(skill)
    }

    /// Check `options` and resolve the tools offered to the provider.
    ///
    /// The effective set starts from the skill's allow-list (full catalog
    /// when absent) and is narrowed by `options.tool_names`. Under
    /// `UnknownToolPolicy::Reject` any unknown name in either list is an error.
    pub fn check_options(
        &self,
        skill: &Skill,
        options: &ExecutionOptions,
    ) -> Result<Vec<&ToolSpec>, OptionsError> {
        if options.max_iterations == 0 {
            return Err(OptionsError::ZeroIterations);
        }
        if options.timeout.is_zero() {
            return Err(OptionsError::ZeroTimeout);
        }

        let skill_tools: Option<BTreeSet<String>> =
            skill.tools.as_ref().map(|t| t.iter().cloned().collect());
        let mut specs = self
            .registry
            .resolve(skill_tools.as_ref(), options.unknown_tool_policy)?;

        if let Some(narrow) = options.tool_names.as_ref().filter(|n| !n.is_empty()) {
            let narrowed = self
                .registry
                .resolve(Some(narrow), options.unknown_tool_policy)?;
            specs.retain(|spec| narrowed.iter().any(|n| n.name == spec.name));
        }

        Ok(specs)
    }

    /// Run `skill` against `input`.
    ///
    /// Every operational outcome (validation failure, approval gate, tool
    /// errors, provider errors, budget, timeout) is an `Ok(ExecutionResult)`.
    /// Only malformed options are an `Err`.
    pub async fn execute(
        &self,
        skill: &Skill,
        input: &str,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, OptionsError> {
        self.execute_with_cancel(skill, input, options, CancellationToken::new())
            .await
    }

    /// [`execute`](Self::execute) with a caller-owned cancellation signal.
    ///
    /// Cancelling the token ends the run as `failed` at the next suspension
    /// point. Tool side effects already performed are not rolled back.
    pub async fn execute_with_cancel(
        &self,
        skill: &Skill,
        input: &str,
        options: &ExecutionOptions,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, OptionsError> {
        let tools = self.check_options(skill, options)?;

        let report = validate_skill(skill);
        if !report.valid {
            warn!(skill.id = %skill.id, errors = ?report.errors, "Skill rejected at validation");
            return Ok(ExecutionResult::rejected(&report.errors));
        }

        let span = info_span!(
            "skill.execute",
            skill.id = %skill.id,
            skill.name = %skill.name,
            skill.test_mode = options.test_mode,
            reasoning.provider = self.provider.name(),
        );

        Ok(self
            .run(skill, input, options, tools, cancel)
            .instrument(span)
            .await)
    }

    async fn run(
        &self,
        skill: &Skill,
        input: &str,
        options: &ExecutionOptions,
        tools: Vec<&ToolSpec>,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let mut logger = ExecutionLogger::new();
        let require_approval = options.requires_approval(skill);
        logger.info_with(
            "Starting skill execution",
            json!({
                "skill_id": skill.id,
                "skill_name": skill.name,
                "test_mode": options.test_mode,
                "require_approval": require_approval,
            }),
        );

        let system_prompt = PromptAssembler::assemble(skill, options.test_mode);
        logger.info("System prompt assembled");

        let tool_names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        logger.info_with(
            format!("{} tools loaded", tools.len()),
            json!({ "tools": tool_names }),
        );

        let started = Instant::now();
        let mut state = RunState::default();

        let outcome = if require_approval && !options.test_mode {
            logger.warn("Manual approval required before continuing");
            Outcome::PendingApproval
        } else {
            let plan = RunPlan {
                system_prompt,
                input,
                tools: tools.iter().map(|spec| spec.definition()).collect(),
                allowed: tools.iter().map(|spec| spec.name).collect(),
                tool_ctx: ToolContext {
                    test_mode: options.test_mode,
                },
                max_iterations: options.max_iterations,
                parallel: options.parallel_tool_calls,
            };
            logger.info("Running reasoning loop");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Outcome::Cancelled,
                res = tokio::time::timeout(
                    options.timeout,
                    self.iterate(&plan, &mut logger, &mut state),
                ) => res.unwrap_or(Outcome::TimedOut),
            }
        };

        Self::finish(outcome, logger, state, started, options)
    }

    async fn iterate(
        &self,
        plan: &RunPlan<'_>,
        logger: &mut ExecutionLogger,
        state: &mut RunState,
    ) -> Outcome {
        for iteration in 1..=plan.max_iterations {
            debug!(iteration, "Asking reasoning provider");
            let request = ReasoningRequest {
                system_prompt: plan.system_prompt.clone(),
                input: plan.input.to_string(),
                tools: plan.tools.clone(),
                history: state.history.clone(),
            };

            let (thought, calls) = match self.provider.ask(&request).await {
                Err(e) => return Outcome::ProviderFailed(e),
                Ok(ReasoningStep::FinalAnswer(answer)) => return Outcome::Answered(answer),
                Ok(ReasoningStep::ToolCalls { thought, calls }) if calls.is_empty() => {
                    return Outcome::Answered(thought.unwrap_or_default());
                }
                Ok(ReasoningStep::ToolCalls { thought, calls }) => (thought, calls),
            };

            let mut exchanges = Vec::with_capacity(calls.len());
            if plan.parallel && calls.len() > 1 {
                // Every dispatch is logged, in request order, before any call is awaited.
                let admitted: Vec<Result<(), ToolError>> = calls
                    .iter()
                    .map(|call| Self::admit(call, plan, logger, state))
                    .collect();
                let outcomes = join_all(
                    calls
                        .iter()
                        .zip(admitted)
                        .map(|(call, admit)| self.call_tool(call, admit, plan)),
                )
                .await;
                for (call, outcome) in calls.into_iter().zip(outcomes) {
                    exchanges.push(Self::record(call, outcome, logger, state));
                }
            } else {
                for call in calls {
                    let admit = Self::admit(&call, plan, logger, state);
                    let outcome = self.call_tool(&call, admit, plan).await;
                    exchanges.push(Self::record(call, outcome, logger, state));
                }
            }

            state.history.push(ReasoningTurn { thought, exchanges });
        }

        Outcome::BudgetExhausted
    }

    /// Decide whether `call` may reach the registry. An admitted call is
    /// logged and tracked as in flight until [`record`](Self::record) sees it.
    fn admit(
        call: &ToolCallRequest,
        plan: &RunPlan<'_>,
        logger: &mut ExecutionLogger,
        state: &mut RunState,
    ) -> Result<(), ToolError> {
        let tool = call.name.parse::<ToolName>()?;
        if !plan.allowed.contains(&tool) {
            return Err(ToolError::NotAllowed(call.name.clone()));
        }

        logger.info_with(
            format!("Dispatching tool: {}", call.name),
            json!({ "call_id": call.id, "input": call.input }),
        );
        state.in_flight.push(InFlightCall {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            input: call.input.to_string(),
            started_at: Utc::now(),
        });
        Ok(())
    }

    async fn call_tool(
        &self,
        call: &ToolCallRequest,
        admit: Result<(), ToolError>,
        plan: &RunPlan<'_>,
    ) -> CallOutcome {
        let started_at = Utc::now();
        let dispatched = admit.is_ok();
        let result = match admit {
            Err(e) => Err(e),
            Ok(()) => {
                self.registry
                    .invoke(&call.name, call.input.clone(), &plan.tool_ctx)
                    .await
            }
        };
        let finished_at = Utc::now();

        let (output, error, observation) = match result {
            Ok(out) => (Some(out.clone()), None, ToolObservation::ok(out)),
            Err(e) => {
                let message = e.to_string();
                (None, Some(message.clone()), ToolObservation::error(message))
            }
        };

        CallOutcome {
            record: ToolCallRecord {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                input: call.input.to_string(),
                output,
                error,
                started_at,
                finished_at,
            },
            observation,
            dispatched,
        }
    }

    /// Append one finished call to the run's logs and telemetry.
    fn record(
        call: ToolCallRequest,
        outcome: CallOutcome,
        logger: &mut ExecutionLogger,
        state: &mut RunState,
    ) -> ToolExchange {
        if outcome.dispatched {
            state.tools_used.insert(call.name.clone());
            if let Some(pos) = state.in_flight.iter().position(|f| f.call_id == call.id) {
                state.in_flight.remove(pos);
            }
        }

        match (&outcome.record.output, &outcome.record.error) {
            (_, Some(error)) => logger.warn_with(
                format!("Tool failed: {}", call.name),
                json!({ "call_id": call.id, "input": call.input, "error": error }),
            ),
            (output, None) => logger.info_with(
                format!("Tool executed: {}", call.name),
                json!({ "call_id": call.id, "input": call.input, "output": output }),
            ),
        }

        state.tool_calls.push(outcome.record);
        ToolExchange {
            call,
            observation: outcome.observation,
        }
    }

    /// The single construction point of a run's [`ExecutionResult`].
    fn finish(
        outcome: Outcome,
        mut logger: ExecutionLogger,
        mut state: RunState,
        started: Instant,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let (status, output, error) = match outcome {
            Outcome::Answered(answer) => {
                logger.info("Execution completed successfully");
                (ExecutionStatus::Succeeded, Some(answer), None)
            }
            Outcome::PendingApproval => (ExecutionStatus::PendingApproval, None, None),
            Outcome::BudgetExhausted => {
                let message = format!(
                    "iteration budget exhausted: no final answer after {} iterations",
                    options.max_iterations
                );
                logger.warn(message.clone());
                (ExecutionStatus::Exited, None, Some(message))
            }
            Outcome::ProviderFailed(e) => {
                Self::failed(&mut logger, format!("reasoning provider error: {e}"))
            }
            Outcome::TimedOut => {
                Self::abandon_in_flight(&mut logger, &mut state, "timed out");
                Self::failed(
                    &mut logger,
                    format!("execution timed out after {}ms", options.timeout.as_millis()),
                )
            }
            Outcome::Cancelled => {
                Self::abandon_in_flight(&mut logger, &mut state, "cancelled");
                Self::failed(&mut logger, "execution cancelled".to_string())
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            status = %status,
            duration_ms,
            tools_used = state.tools_used.len(),
            tool_calls = state.tool_calls.len(),
            "Skill execution finished"
        );

        ExecutionResult {
            success: status == ExecutionStatus::Succeeded,
            output,
            error,
            logs: logger.into_entries(),
            tools_used: state.tools_used,
            tool_calls: state.tool_calls,
            duration_ms,
            status,
        }
    }

    /// Close out calls still running when the run stopped. Their side effects
    /// may have happened, so they stay visible in logs and telemetry.
    fn abandon_in_flight(logger: &mut ExecutionLogger, state: &mut RunState, reason: &str) {
        let finished_at = Utc::now();
        for call in state.in_flight.drain(..) {
            let error = format!("abandoned: run {reason}");
            logger.warn_with(
                format!("Tool abandoned: {}", call.tool_name),
                json!({ "call_id": call.call_id, "input": call.input, "error": error }),
            );
            state.tools_used.insert(call.tool_name.clone());
            state.tool_calls.push(ToolCallRecord {
                call_id: call.call_id,
                tool_name: call.tool_name,
                input: call.input,
                output: None,
                error: Some(error),
                started_at: call.started_at,
                finished_at,
            });
        }
    }

    fn failed(
        logger: &mut ExecutionLogger,
        message: String,
    ) -> (ExecutionStatus, Option<String>, Option<String>) {
        logger.error_with("Execution failed", json!({ "error": message }));
        (ExecutionStatus::Failed, None, Some(message))
    }
}
