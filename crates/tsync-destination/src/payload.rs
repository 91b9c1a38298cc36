//! Write payloads.
//!
//! Update: `{"id", "label", "entities", "type": "customTopic"}`
//! Create: `{"label", "entities", "type": "customTopic"}`

use serde::Serialize;
use tsync_reconcile::{Entry, WriteIntent, LIST_KIND_TOPIC};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub label: &'a str,
    pub entities: &'a [Entry],
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> ListPayload<'a> {
    pub fn update(id: &'a str, label: &'a str, entities: &'a [Entry]) -> Self {
        Self {
            id: Some(id),
            label,
            entities,
            kind: LIST_KIND_TOPIC,
        }
    }

    pub fn create(label: &'a str, entities: &'a [Entry]) -> Self {
        Self {
            id: None,
            label,
            entities,
            kind: LIST_KIND_TOPIC,
        }
    }

    pub fn from_intent(intent: &'a WriteIntent) -> Self {
        match intent {
            WriteIntent::UpdateList { id, label, entries } => Self::update(id, label, entries),
            WriteIntent::CreateList { label, entries } => Self::create(label, entries),
        }
    }
}

/// Pretty JSON of the payload an intent would send. Used for dry-run output.
pub fn render(intent: &WriteIntent) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ListPayload::from_intent(intent))
}
