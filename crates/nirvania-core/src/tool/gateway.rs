//! CrmGateway trait -- the port through which tools reach CRM state.
//!
//! The registry never touches storage itself. Every effect a tool has goes
//! through this trait, which nirvania-infra implements.

use serde_json::Value;
use thiserror::Error;

use nirvania_types::tool::{
    CreateDealInput, LogActivityInput, ScheduleMeetingInput, SearchContactsInput, SendEmailInput,
    UpdateContactInput, UpdateDealStageInput,
};

/// Errors from CRM gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// CRM operations available to tools.
///
/// Each method returns the JSON payload describing the affected entity.
/// Mutating methods are never called for test-mode runs.
pub trait CrmGateway: Send + Sync {
    fn search_contacts(
        &self,
        input: &SearchContactsInput,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, GatewayError>> + Send;

    fn contact_details(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;

    fn update_contact(
        &self,
        input: &UpdateContactInput,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;

    fn send_email(
        &self,
        input: &SendEmailInput,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;

    fn schedule_meeting(
        &self,
        input: &ScheduleMeetingInput,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;

    fn create_deal(
        &self,
        input: &CreateDealInput,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;

    fn update_deal_stage(
        &self,
        input: &UpdateDealStageInput,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;

    fn log_activity(
        &self,
        input: &LogActivityInput,
    ) -> impl std::future::Future<Output = Result<Value, GatewayError>> + Send;
}
