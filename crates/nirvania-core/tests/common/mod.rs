//! Hand-written doubles for the engine's ports.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use uuid::Uuid;

use nirvania_core::llm::reasoning::ReasoningProvider;
use nirvania_core::skill::engine::SkillExecutionEngine;
use nirvania_core::skill::recorder::RunRecorder;
use nirvania_core::tool::gateway::{CrmGateway, GatewayError};
use nirvania_core::tool::registry::ToolRegistry;
use nirvania_types::error::RepositoryError;
use nirvania_types::execution::ExecutionResult;
use nirvania_types::llm::LlmError;
use nirvania_types::reasoning::{ReasoningRequest, ReasoningStep, ToolCallRequest};
use nirvania_types::skill::{SkillCounters, SkillId, SkillRun};
use nirvania_types::tool::{
    CreateDealInput, LogActivityInput, ScheduleMeetingInput, SearchContactsInput, SendEmailInput,
    UpdateContactInput, UpdateDealStageInput,
};

// ---------------------------------------------------------------------------
// Reasoning provider
// ---------------------------------------------------------------------------

pub enum Reply {
    Step(ReasoningStep),
    Fail(String),
    /// Never resolves.
    Hang,
}

/// Plays back a fixed script of replies, then repeats `fallback` (or hangs).
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<ReasoningStep>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self::new(vec![Reply::Step(ReasoningStep::FinalAnswer(
            answer.to_string(),
        ))])
    }

    pub fn repeating(step: ReasoningStep) -> Self {
        Self {
            fallback: Some(step),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn request(&self, index: usize) -> ReasoningRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn ask(
        &self,
        request: &ReasoningRequest,
    ) -> impl Future<Output = Result<ReasoningStep, LlmError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone().map(Reply::Step))
            .unwrap_or(Reply::Hang);

        async move {
            match reply {
                Reply::Step(step) => Ok(step),
                Reply::Fail(message) => Err(LlmError::Provider { message }),
                Reply::Hang => std::future::pending().await,
            }
        }
    }
}

pub fn call(id: &str, name: &str, input: Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Reply {
    Reply::Step(ReasoningStep::ToolCalls {
        thought: None,
        calls,
    })
}

pub fn answer(text: &str) -> Reply {
    Reply::Step(ReasoningStep::FinalAnswer(text.to_string()))
}

// ---------------------------------------------------------------------------
// CRM gateway
// ---------------------------------------------------------------------------

/// Records which gateway operations ran.
#[derive(Default)]
pub struct RecordingGateway {
    pub calls: Mutex<Vec<&'static str>>,
    /// `search_contacts` sleeps `limit` milliseconds before answering.
    pub search_delay: bool,
}

impl RecordingGateway {
    pub fn with_search_delay() -> Self {
        Self {
            search_delay: true,
            ..Self::default()
        }
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn hit(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }
}

impl CrmGateway for RecordingGateway {
    fn search_contacts(
        &self,
        input: &SearchContactsInput,
    ) -> impl Future<Output = Result<Vec<Value>, GatewayError>> + Send {
        self.hit("search_contacts");
        let delay = self
            .search_delay
            .then(|| Duration::from_millis(u64::from(input.limit)));
        let query = input.query.clone();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(vec![json!({"id": "c1", "name": "Ana", "query": query})])
        }
    }

    fn contact_details(
        &self,
        contact_id: &str,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("contact_details");
        let id = contact_id.to_string();
        async move {
            if id == "c1" {
                Ok(json!({"id": id, "name": "Ana"}))
            } else {
                Err(GatewayError::NotFound {
                    entity: "contact",
                    id,
                })
            }
        }
    }

    fn update_contact(
        &self,
        input: &UpdateContactInput,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("update_contact");
        let id = input.contact_id.clone();
        async move { Ok(json!({"id": id})) }
    }

    fn send_email(
        &self,
        input: &SendEmailInput,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("send_email");
        let to = input.to.clone();
        async move { Ok(json!({"to": to})) }
    }

    fn schedule_meeting(
        &self,
        _input: &ScheduleMeetingInput,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("schedule_meeting");
        async { Ok(json!({})) }
    }

    fn create_deal(
        &self,
        _input: &CreateDealInput,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("create_deal");
        async { Ok(json!({})) }
    }

    fn update_deal_stage(
        &self,
        _input: &UpdateDealStageInput,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("update_deal_stage");
        async { Ok(json!({})) }
    }

    fn log_activity(
        &self,
        _input: &LogActivityInput,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send {
        self.hit("log_activity");
        async { Ok(json!({})) }
    }
}

// ---------------------------------------------------------------------------
// Run recorder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryRecorder {
    runs: Mutex<HashMap<Uuid, SkillRun>>,
    counters: Mutex<HashMap<SkillId, SkillCounters>>,
    /// When set, `finish_run` fails as if the store went away mid-run.
    pub finish_fails: AtomicBool,
}

impl InMemoryRecorder {
    pub fn failing_finish() -> Self {
        let recorder = Self::default();
        recorder.finish_fails.store(true, Ordering::SeqCst);
        recorder
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

impl RunRecorder for InMemoryRecorder {
    fn start_run(
        &self,
        skill_id: &SkillId,
        input: &str,
        test_mode: bool,
    ) -> impl Future<Output = Result<SkillRun, RepositoryError>> + Send {
        let run = SkillRun::started(*skill_id, input, test_mode);
        self.runs.lock().unwrap().insert(run.id, run.clone());
        async move { Ok(run) }
    }

    fn finish_run(
        &self,
        run_id: &Uuid,
        result: &ExecutionResult,
    ) -> impl Future<Output = Result<SkillRun, RepositoryError>> + Send {
        let outcome = if self.finish_fails.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection)
        } else {
            let mut runs = self.runs.lock().unwrap();
            match runs.get_mut(run_id) {
                Some(run) => {
                    run.complete(result);
                    self.counters
                        .lock()
                        .unwrap()
                        .entry(run.skill_id)
                        .or_default()
                        .apply(result.status);
                    Ok(run.clone())
                }
                None => Err(RepositoryError::NotFound),
            }
        };
        async move { outcome }
    }

    fn get_run(
        &self,
        run_id: &Uuid,
    ) -> impl Future<Output = Result<Option<SkillRun>, RepositoryError>> + Send {
        let run = self.runs.lock().unwrap().get(run_id).cloned();
        async move { Ok(run) }
    }

    fn list_runs(
        &self,
        skill_id: &SkillId,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<SkillRun>, RepositoryError>> + Send {
        let mut runs: Vec<SkillRun> = self
            .runs
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.skill_id == *skill_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit as usize);
        async move { Ok(runs) }
    }

    fn counters(
        &self,
        skill_id: &SkillId,
    ) -> impl Future<Output = Result<SkillCounters, RepositoryError>> + Send {
        let counters = self
            .counters
            .lock()
            .unwrap()
            .get(skill_id)
            .copied()
            .unwrap_or_default();
        async move { Ok(counters) }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub registry: Arc<ToolRegistry<RecordingGateway>>,
    pub engine: SkillExecutionEngine<ScriptedProvider, RecordingGateway>,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        Self::with_gateway(provider, RecordingGateway::default())
    }

    pub fn with_gateway(provider: ScriptedProvider, gateway: RecordingGateway) -> Self {
        let provider = Arc::new(provider);
        let registry = Arc::new(ToolRegistry::new(gateway));
        let engine = SkillExecutionEngine::new(Arc::clone(&provider), Arc::clone(&registry));
        Self {
            provider,
            registry,
            engine,
        }
    }

    pub fn gateway_operations(&self) -> Vec<&'static str> {
        self.registry.gateway().operations()
    }
}
