//! Static catalog metadata: descriptions, input schemas, slash commands.

use schemars::JsonSchema;
use serde_json::Value;

use nirvania_types::llm::ToolDefinition;
use nirvania_types::tool::{
    CreateDealInput, GetContactDetailsInput, LogActivityInput, ScheduleMeetingInput,
    SearchContactsInput, SendEmailInput, ToolEffect, ToolName, UpdateContactInput,
    UpdateDealStageInput,
};

/// Everything the registry knows about one tool besides how to run it.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub effect: ToolEffect,
    /// JSON schema of the typed input.
    pub input_schema: Value,
    pub slash_command: &'static str,
    pub example: &'static str,
}

impl ToolSpec {
    pub fn for_name(name: ToolName) -> Self {
        let (description, example, input_schema) = match name {
            ToolName::SearchContacts => (
                "Search CRM contacts with filters. Useful for finding leads, customers or prospects.",
                r#"/search_contacts query:"tech company" country:MX"#,
                schema::<SearchContactsInput>(),
            ),
            ToolName::GetContactDetails => (
                "Get full details of one contact, including company and deals.",
                r#"/get_contact_details contact_id:"123""#,
                schema::<GetContactDetailsInput>(),
            ),
            ToolName::UpdateContact => (
                "Update phone, role, location or notes of an existing contact.",
                r#"/update_contact contact_id:"123" updates.role:"CTO""#,
                schema::<UpdateContactInput>(),
            ),
            ToolName::SendEmail => (
                "Send an email to a contact. Simulated in test mode.",
                r#"/send_email to:"ana@example.com" subject:"Follow-up""#,
                schema::<SendEmailInput>(),
            ),
            ToolName::ScheduleMeeting => (
                "Schedule a meeting with a contact and send a calendar invite.",
                r#"/schedule_meeting title:"Demo" datetime:"2024-12-01T10:00""#,
                schema::<ScheduleMeetingInput>(),
            ),
            ToolName::CreateDeal => (
                "Create a new deal in the pipeline.",
                r#"/create_deal name:"Software sale" amount:50000"#,
                schema::<CreateDealInput>(),
            ),
            ToolName::UpdateDealStage => (
                "Move a deal to another pipeline stage.",
                r#"/update_deal_stage deal_id:"42" new_stage:"Proposal""#,
                schema::<UpdateDealStageInput>(),
            ),
            ToolName::LogActivity => (
                "Record an activity on a contact or deal timeline.",
                r#"/log_activity type:"call" description:"Follow-up call""#,
                schema::<LogActivityInput>(),
            ),
        };

        Self {
            name,
            description,
            effect: name.effect(),
            input_schema,
            slash_command: slash_command(name),
            example,
        }
    }

    /// The definition offered to a reasoning provider.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.as_str().to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema.clone(),
        }
    }
}

fn slash_command(name: ToolName) -> &'static str {
    match name {
        ToolName::SearchContacts => "/search_contacts",
        ToolName::GetContactDetails => "/get_contact_details",
        ToolName::UpdateContact => "/update_contact",
        ToolName::SendEmail => "/send_email",
        ToolName::ScheduleMeeting => "/schedule_meeting",
        ToolName::CreateDeal => "/create_deal",
        ToolName::UpdateDealStage => "/update_deal_stage",
        ToolName::LogActivity => "/log_activity",
    }
}

/// Input schema for `T`, without the `$schema` meta key.
fn schema<T: JsonSchema>() -> Value {
    let mut value = schemars::schema_for!(T).to_value();
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
    }
    value
}
