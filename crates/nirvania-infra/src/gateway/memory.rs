//! In-process CRM backend.
//!
//! `InMemoryCrmGateway` keeps contacts, deals and activities in `DashMap`s so
//! concurrent tool calls from parallel runs never block each other. It backs
//! the CLI and local experiments; a hosted CRM would implement the same port.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use nirvania_core::tool::gateway::{CrmGateway, GatewayError};
use nirvania_types::tool::{
    ActivityType, CreateDealInput, LogActivityInput, ScheduleMeetingInput, SearchContactsInput,
    SendEmailInput, UpdateContactInput, UpdateDealStageInput,
};

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub country: String,
    pub company_id: Option<String>,
    pub company: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub contact_id: String,
    pub company_id: String,
    pub amount: f64,
    pub currency: String,
    pub stage: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub contact_id: Option<String>,
    pub deal_id: Option<String>,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryCrmGateway {
    contacts: DashMap<String, Contact>,
    deals: DashMap<String, Deal>,
    activities: DashMap<String, Activity>,
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::Backend(e.to_string()))
}

fn activity_kind(kind: ActivityType) -> &'static str {
    match kind {
        ActivityType::Call => "call",
        ActivityType::Email => "email",
        ActivityType::Meeting => "meeting",
        ActivityType::Note => "note",
        ActivityType::Task => "task",
    }
}

impl InMemoryCrmGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway seeded with a handful of demo contacts and one open deal.
    pub fn with_demo_data() -> Self {
        let gateway = Self::new();
        let now = Utc::now();
        let seed = [
            ("contact-1", "Ana Torres", "ana@andina.co", "CO", "company-1", "Andina Logistics", Some(3)),
            ("contact-2", "Bruno Costa", "bruno@sertao.com.br", "BR", "company-2", "Sertão Foods", Some(45)),
            ("contact-3", "Carla Méndez", "carla@nopal.mx", "MX", "company-3", "Nopal Tech", None),
            ("contact-4", "Diego Ruiz", "diego@nopal.mx", "MX", "company-3", "Nopal Tech", Some(12)),
        ];
        for (id, name, email, country, company_id, company, days_ago) in seed {
            gateway.insert_contact(Contact {
                id: id.to_string(),
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: None,
                role: None,
                location: None,
                notes: None,
                country: country.to_string(),
                company_id: Some(company_id.to_string()),
                company: Some(company.to_string()),
                last_contacted_at: days_ago.map(|d| now - Duration::days(d)),
            });
        }
        gateway.deals.insert(
            "deal-1".to_string(),
            Deal {
                id: "deal-1".to_string(),
                name: "Andina fleet rollout".to_string(),
                contact_id: "contact-1".to_string(),
                company_id: "company-1".to_string(),
                amount: 48_000.0,
                currency: "USD".to_string(),
                stage: "Proposal".to_string(),
                status: "open".to_string(),
            },
        );
        gateway
    }

    pub fn insert_contact(&self, contact: Contact) {
        self.contacts.insert(contact.id.clone(), contact);
    }

    pub fn contact(&self, id: &str) -> Option<Contact> {
        self.contacts.get(id).map(|c| c.clone())
    }

    pub fn deal(&self, id: &str) -> Option<Deal> {
        self.deals.get(id).map(|d| d.clone())
    }

    /// All activities, oldest first.
    pub fn activities(&self) -> Vec<Activity> {
        let mut all: Vec<Activity> = self.activities.iter().map(|a| a.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all
    }

    fn deals_for(&self, contact_id: &str) -> Vec<Deal> {
        self.deals
            .iter()
            .filter(|d| d.contact_id == contact_id)
            .map(|d| d.clone())
            .collect()
    }

    fn require_contact(&self, id: &str) -> Result<Contact, GatewayError> {
        self.contact(id).ok_or_else(|| GatewayError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })
    }

    fn record_activity(
        &self,
        kind: &str,
        contact_id: Option<String>,
        deal_id: Option<String>,
        description: String,
        metadata: Map<String, Value>,
    ) -> Activity {
        let activity = Activity {
            id: Uuid::now_v7().to_string(),
            kind: kind.to_string(),
            contact_id,
            deal_id,
            description,
            metadata,
            created_at: Utc::now(),
        };
        self.activities.insert(activity.id.clone(), activity.clone());
        activity
    }

    fn touch_contact(&self, contact_id: &str) {
        if let Some(mut contact) = self.contacts.get_mut(contact_id) {
            contact.last_contacted_at = Some(Utc::now());
        }
    }
}

impl CrmGateway for InMemoryCrmGateway {
    async fn search_contacts(&self, input: &SearchContactsInput) -> Result<Vec<Value>, GatewayError> {
        let needle = input.query.as_deref().map(str::to_lowercase);
        let cutoff = input
            .last_contacted_days_ago
            .map(|days| Utc::now() - Duration::days(i64::from(days)));

        let mut matches: Vec<(Contact, usize)> = self
            .contacts
            .iter()
            .filter(|c| match &needle {
                Some(q) => {
                    c.name.to_lowercase().contains(q)
                        || c.email.as_deref().is_some_and(|e| e.to_lowercase().contains(q))
                }
                None => true,
            })
            .filter(|c| {
                input
                    .country
                    .as_deref()
                    .is_none_or(|country| c.country.eq_ignore_ascii_case(country))
            })
            .filter(|c| match cutoff {
                Some(cutoff) => c.last_contacted_at.is_none_or(|at| at < cutoff),
                None => true,
            })
            .map(|c| c.clone())
            .map(|c| {
                let deals = self.deals_for(&c.id).len();
                (c, deals)
            })
            .filter(|(_, deals)| input.has_deals.is_none_or(|want| want == (*deals > 0)))
            .collect();

        matches.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        matches.truncate(input.limit as usize);

        Ok(matches
            .into_iter()
            .map(|(c, deals)| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "email": c.email,
                    "company": c.company,
                    "deals_count": deals,
                })
            })
            .collect())
    }

    async fn contact_details(&self, contact_id: &str) -> Result<Value, GatewayError> {
        let contact = self.require_contact(contact_id)?;
        let mut value = to_value(&contact)?;
        value["deals"] = to_value(&self.deals_for(contact_id))?;
        Ok(value)
    }

    async fn update_contact(&self, input: &UpdateContactInput) -> Result<Value, GatewayError> {
        let mut contact = self
            .contacts
            .get_mut(&input.contact_id)
            .ok_or_else(|| GatewayError::NotFound {
                entity: "contact",
                id: input.contact_id.clone(),
            })?;

        let updates = &input.updates;
        if updates.phone.is_none()
            && updates.role.is_none()
            && updates.location.is_none()
            && updates.notes.is_none()
        {
            return Err(GatewayError::Invalid("no fields to update".to_string()));
        }
        if let Some(phone) = &updates.phone {
            contact.phone = Some(phone.clone());
        }
        if let Some(role) = &updates.role {
            contact.role = Some(role.clone());
        }
        if let Some(location) = &updates.location {
            contact.location = Some(location.clone());
        }
        if let Some(notes) = &updates.notes {
            contact.notes = Some(notes.clone());
        }
        to_value(&*contact)
    }

    async fn send_email(&self, input: &SendEmailInput) -> Result<Value, GatewayError> {
        if !input.to.contains('@') {
            return Err(GatewayError::Invalid(format!(
                "'{}' is not an email address",
                input.to
            )));
        }
        if let Some(contact_id) = &input.contact_id {
            self.require_contact(contact_id)?;
            self.touch_contact(contact_id);
            let mut metadata = Map::new();
            metadata.insert("subject".to_string(), json!(input.subject));
            metadata.insert("to".to_string(), json!(input.to));
            self.record_activity(
                "email_sent",
                Some(contact_id.clone()),
                None,
                input.subject.clone(),
                metadata,
            );
        }
        Ok(json!({ "to": input.to, "subject": input.subject }))
    }

    async fn schedule_meeting(&self, input: &ScheduleMeetingInput) -> Result<Value, GatewayError> {
        self.require_contact(&input.contact_id)?;
        let starts_at = DateTime::parse_from_rfc3339(&input.datetime).map_err(|e| {
            GatewayError::Invalid(format!("datetime must be ISO 8601: {e}"))
        })?;

        let mut metadata = Map::new();
        metadata.insert("datetime".to_string(), json!(starts_at.to_rfc3339()));
        metadata.insert("duration".to_string(), json!(input.duration));
        if let Some(notes) = &input.notes {
            metadata.insert("notes".to_string(), json!(notes));
        }
        let activity = self.record_activity(
            "meeting",
            Some(input.contact_id.clone()),
            None,
            input.title.clone(),
            metadata,
        );

        Ok(json!({
            "id": activity.id,
            "title": input.title,
            "datetime": starts_at.to_rfc3339(),
            "duration": input.duration,
            "contact_id": input.contact_id,
        }))
    }

    async fn create_deal(&self, input: &CreateDealInput) -> Result<Value, GatewayError> {
        self.require_contact(&input.contact_id)?;
        if !input.amount.is_finite() || input.amount < 0.0 {
            return Err(GatewayError::Invalid(format!(
                "amount must be a non-negative number, got {}",
                input.amount
            )));
        }

        let deal = Deal {
            id: Uuid::now_v7().to_string(),
            name: input.name.clone(),
            contact_id: input.contact_id.clone(),
            company_id: input.company_id.clone(),
            amount: input.amount,
            currency: input.currency.clone(),
            stage: input.stage.clone(),
            status: "open".to_string(),
        };
        self.deals.insert(deal.id.clone(), deal.clone());
        to_value(&deal)
    }

    async fn update_deal_stage(&self, input: &UpdateDealStageInput) -> Result<Value, GatewayError> {
        let deal = {
            let mut deal = self
                .deals
                .get_mut(&input.deal_id)
                .ok_or_else(|| GatewayError::NotFound {
                    entity: "deal",
                    id: input.deal_id.clone(),
                })?;
            deal.stage = input.new_stage.clone();
            deal.clone()
        };

        if let Some(notes) = &input.notes {
            let mut metadata = Map::new();
            metadata.insert("stage".to_string(), json!(input.new_stage));
            metadata.insert("notes".to_string(), json!(notes));
            self.record_activity(
                "stage_changed",
                None,
                Some(deal.id.clone()),
                notes.clone(),
                metadata,
            );
        }
        to_value(&deal)
    }

    async fn log_activity(&self, input: &LogActivityInput) -> Result<Value, GatewayError> {
        if input.contact_id.is_none() && input.deal_id.is_none() {
            return Err(GatewayError::Invalid(
                "an activity needs a contact_id or a deal_id".to_string(),
            ));
        }
        if let Some(contact_id) = &input.contact_id {
            self.require_contact(contact_id)?;
        }
        if let Some(deal_id) = &input.deal_id
            && self.deal(deal_id).is_none()
        {
            return Err(GatewayError::NotFound {
                entity: "deal",
                id: deal_id.clone(),
            });
        }

        let activity = self.record_activity(
            activity_kind(input.activity_type),
            input.contact_id.clone(),
            input.deal_id.clone(),
            input.description.clone(),
            input.metadata.clone().unwrap_or_default(),
        );
        if let Some(contact_id) = &input.contact_id {
            self.touch_contact(contact_id);
        }
        to_value(&activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nirvania_types::tool::ContactUpdates;

    fn search(query: Option<&str>) -> SearchContactsInput {
        serde_json::from_value(json!({ "query": query })).unwrap()
    }

    #[tokio::test]
    async fn test_search_by_query_and_country() {
        let gw = InMemoryCrmGateway::with_demo_data();

        let found = gw.search_contacts(&search(Some("nopal"))).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["name"], "Carla Méndez");

        let mut input = search(None);
        input.country = Some("br".to_string());
        let found = gw.search_contacts(&input).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], "contact-2");
    }

    #[tokio::test]
    async fn test_search_filters_deals_and_recency() {
        let gw = InMemoryCrmGateway::with_demo_data();

        let mut input = search(None);
        input.has_deals = Some(true);
        let found = gw.search_contacts(&input).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["deals_count"], 1);

        let mut input = search(None);
        input.last_contacted_days_ago = Some(30);
        let ids: Vec<Value> = gw
            .search_contacts(&input)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("contact-2"), json!("contact-3")]);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let gw = InMemoryCrmGateway::with_demo_data();
        let mut input = search(None);
        input.limit = 2;
        assert_eq!(gw.search_contacts(&input).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_contact_details_include_deals() {
        let gw = InMemoryCrmGateway::with_demo_data();
        let details = gw.contact_details("contact-1").await.unwrap();
        assert_eq!(details["name"], "Ana Torres");
        assert_eq!(details["deals"][0]["id"], "deal-1");

        let err = gw.contact_details("nobody").await.unwrap_err();
        assert_eq!(err.to_string(), "contact 'nobody' not found");
    }

    #[tokio::test]
    async fn test_update_contact_applies_fields() {
        let gw = InMemoryCrmGateway::with_demo_data();
        let input = UpdateContactInput {
            contact_id: "contact-3".to_string(),
            updates: ContactUpdates {
                role: Some("CTO".to_string()),
                ..ContactUpdates::default()
            },
        };
        gw.update_contact(&input).await.unwrap();
        assert_eq!(gw.contact("contact-3").unwrap().role.as_deref(), Some("CTO"));

        let empty = UpdateContactInput {
            contact_id: "contact-3".to_string(),
            updates: ContactUpdates::default(),
        };
        assert!(matches!(
            gw.update_contact(&empty).await,
            Err(GatewayError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_deal_lifecycle_logs_stage_change() {
        let gw = InMemoryCrmGateway::with_demo_data();
        let deal = gw
            .create_deal(&CreateDealInput {
                name: "Nopal pilot".to_string(),
                contact_id: "contact-3".to_string(),
                company_id: "company-3".to_string(),
                amount: 12_500.0,
                currency: "MXN".to_string(),
                stage: "Prospect".to_string(),
            })
            .await
            .unwrap();
        let deal_id = deal["id"].as_str().unwrap().to_string();

        gw.update_deal_stage(&UpdateDealStageInput {
            deal_id: deal_id.clone(),
            new_stage: "Negotiation".to_string(),
            notes: Some("Pricing agreed".to_string()),
        })
        .await
        .unwrap();

        assert_eq!(gw.deal(&deal_id).unwrap().stage, "Negotiation");
        let activities = gw.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].kind, "stage_changed");
    }

    #[tokio::test]
    async fn test_schedule_meeting_requires_iso_datetime() {
        let gw = InMemoryCrmGateway::with_demo_data();
        let mut input = ScheduleMeetingInput {
            contact_id: "contact-1".to_string(),
            title: "Kickoff".to_string(),
            datetime: "next tuesday".to_string(),
            duration: 30,
            notes: None,
        };
        assert!(matches!(
            gw.schedule_meeting(&input).await,
            Err(GatewayError::Invalid(_))
        ));

        input.datetime = "2026-11-03T15:00:00Z".to_string();
        let meeting = gw.schedule_meeting(&input).await.unwrap();
        assert_eq!(meeting["duration"], 30);
        assert_eq!(gw.activities()[0].kind, "meeting");
    }

    #[tokio::test]
    async fn test_log_activity_needs_a_subject() {
        let gw = InMemoryCrmGateway::with_demo_data();
        let input: LogActivityInput = serde_json::from_value(json!({
            "type": "call",
            "description": "Left a voicemail"
        }))
        .unwrap();
        assert!(matches!(
            gw.log_activity(&input).await,
            Err(GatewayError::Invalid(_))
        ));

        let input: LogActivityInput = serde_json::from_value(json!({
            "type": "call",
            "contact_id": "contact-2",
            "description": "Left a voicemail"
        }))
        .unwrap();
        let activity = gw.log_activity(&input).await.unwrap();
        assert_eq!(activity["type"], "call");
        assert!(gw.contact("contact-2").unwrap().last_contacted_at.is_some());
    }
}
