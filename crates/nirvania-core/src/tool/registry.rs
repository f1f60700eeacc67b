//! ToolRegistry -- the closed catalog of CRM tools and their dispatch.
//!
//! The registry is a read-only value shared by every run. Lookup is pure;
//! invocation decodes the raw JSON input into a [`ToolInput`] and dispatches
//! with a `match`. Test mode is part of the invocation contract: mutating
//! tools return a simulated payload without reaching the gateway.

use std::collections::BTreeSet;

use serde_json::{Value, json};
use tracing::debug;

use nirvania_types::error::RegistryError;
use nirvania_types::execution::UnknownToolPolicy;
use nirvania_types::tool::{ToolEffect, ToolError, ToolInput, ToolName};

use super::catalog::ToolSpec;
use super::gateway::{CrmGateway, GatewayError};

/// Per-invocation context passed to every tool call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolContext {
    pub test_mode: bool,
}

/// The tool catalog plus the gateway its tools act through.
pub struct ToolRegistry<G> {
    gateway: G,
    specs: Vec<ToolSpec>,
}

impl<G: CrmGateway> ToolRegistry<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            specs: ToolName::ALL.into_iter().map(ToolSpec::for_name).collect(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The full catalog in catalog order.
    pub fn catalog(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|spec| spec.name.as_str() == name)
    }

    /// Tools matching `names`, in catalog order.
    ///
    /// An absent or empty set yields the full catalog. Unknown names are
    /// dropped silently.
    pub fn lookup(&self, names: Option<&BTreeSet<String>>) -> Vec<&ToolSpec> {
        match names {
            Some(names) if !names.is_empty() => self
                .specs
                .iter()
                .filter(|spec| names.contains(spec.name.as_str()))
                .collect(),
            _ => self.specs.iter().collect(),
        }
    }

    /// Like [`lookup`](Self::lookup), but `UnknownToolPolicy::Reject` turns
    /// unknown names into an error.
    pub fn resolve(
        &self,
        names: Option<&BTreeSet<String>>,
        policy: UnknownToolPolicy,
    ) -> Result<Vec<&ToolSpec>, RegistryError> {
        if policy == UnknownToolPolicy::Reject
            && let Some(names) = names
        {
            let unknown: Vec<String> = names
                .iter()
                .filter(|name| self.get(name).is_none())
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(RegistryError::UnknownTools(unknown));
            }
        }
        Ok(self.lookup(names))
    }

    /// Decode and run one tool call. Returns the JSON observation text.
    pub async fn invoke(
        &self,
        name: &str,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool: ToolName = name.parse()?;
        let input = ToolInput::decode(tool, input)?;
        let payload = self.dispatch(input, ctx).await?;
        Ok(payload.to_string())
    }

    /// Run a decoded tool call.
    pub async fn dispatch(&self, input: ToolInput, ctx: &ToolContext) -> Result<Value, ToolError> {
        let tool = input.name();
        if ctx.test_mode && tool.effect() == ToolEffect::Mutating {
            debug!(tool = %tool, "Simulating mutating tool in test mode");
            return Ok(simulate(&input));
        }

        let gateway_err = |e: GatewayError| ToolError::Gateway {
            tool: tool.as_str().to_string(),
            message: e.to_string(),
        };

        let payload = match &input {
            ToolInput::SearchContacts(i) => {
                let contacts = self.gateway.search_contacts(i).await.map_err(gateway_err)?;
                json!({ "success": true, "count": contacts.len(), "contacts": contacts })
            }
            ToolInput::GetContactDetails(i) => {
                let contact = self
                    .gateway
                    .contact_details(&i.contact_id)
                    .await
                    .map_err(gateway_err)?;
                json!({ "success": true, "contact": contact })
            }
            ToolInput::UpdateContact(i) => {
                let contact = self.gateway.update_contact(i).await.map_err(gateway_err)?;
                json!({ "success": true, "contact": contact })
            }
            ToolInput::SendEmail(i) => {
                let email = self.gateway.send_email(i).await.map_err(gateway_err)?;
                json!({ "success": true, "message": "Email sent", "email": email })
            }
            ToolInput::ScheduleMeeting(i) => {
                let meeting = self.gateway.schedule_meeting(i).await.map_err(gateway_err)?;
                json!({ "success": true, "message": "Meeting scheduled", "meeting": meeting })
            }
            ToolInput::CreateDeal(i) => {
                let deal = self.gateway.create_deal(i).await.map_err(gateway_err)?;
                json!({ "success": true, "deal": deal })
            }
            ToolInput::UpdateDealStage(i) => {
                let deal = self.gateway.update_deal_stage(i).await.map_err(gateway_err)?;
                json!({ "success": true, "deal": deal })
            }
            ToolInput::LogActivity(i) => {
                let activity = self.gateway.log_activity(i).await.map_err(gateway_err)?;
                json!({ "success": true, "activity": activity })
            }
        };
        Ok(payload)
    }
}

/// Test-mode payload for a mutating tool.
fn simulate(input: &ToolInput) -> Value {
    let details = match input {
        ToolInput::SendEmail(i) => json!({
            "to": i.to,
            "subject": i.subject,
            "preview": preview(&i.body, 100),
        }),
        ToolInput::UpdateContact(i) => json!({ "contact_id": i.contact_id, "updates": i.updates }),
        ToolInput::ScheduleMeeting(i) => json!({
            "contact_id": i.contact_id,
            "title": i.title,
            "datetime": i.datetime,
            "duration": i.duration,
        }),
        ToolInput::CreateDeal(i) => json!({
            "name": i.name,
            "amount": i.amount,
            "currency": i.currency,
            "stage": i.stage,
        }),
        ToolInput::UpdateDealStage(i) => json!({ "deal_id": i.deal_id, "new_stage": i.new_stage }),
        ToolInput::LogActivity(i) => json!({
            "type": i.activity_type,
            "description": i.description,
        }),
        ToolInput::SearchContacts(_) | ToolInput::GetContactDetails(_) => Value::Null,
    };

    json!({
        "success": true,
        "simulated": true,
        "message": format!("{} simulated (test mode); nothing was changed", input.name()),
        "details": details,
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
