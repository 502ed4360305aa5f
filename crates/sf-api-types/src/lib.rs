use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the paginated list. Extra fields sent by the list API are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    Scroll,
    Click,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::Scroll => "scroll",
            EventType::Click => "click",
        }
    }
}

/// Body of `POST /event` as sent by the feed client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventPayload {
    pub user_id: u64,
    pub event_type: EventType,
    pub action: String,
    pub info: Value,
}

/// Body of `POST /event` as accepted by the collector: any event type string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomingEvent {
    pub user_id: u64,
    pub event_type: String,
    pub action: String,
    #[serde(default)]
    pub info: Value,
}

/// An event after the collector stamped it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedEvent {
    pub event_id: String,
    pub user_id: u64,
    pub event_ts: u64,
    pub event_type: String,
    pub action: String,
    pub info: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAcceptedResponse {
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<CollectedEvent>,
}
