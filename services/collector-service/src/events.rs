use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use sf_api_types::{CollectedEvent, EventAcceptedResponse, EventListResponse, IncomingEvent};
use sf_storage::EventFilter;
use tracing::{error, info};
use uuid::Uuid;

use crate::{ApiResult, AppState, epoch_ms, internal_error};

const DEFAULT_LIST_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub(crate) struct EventListQuery {
    pub(crate) limit: Option<usize>,
    pub(crate) event_type: Option<String>,
    pub(crate) user_id: Option<u64>,
}

pub(crate) async fn collect_event(
    State(state): State<AppState>,
    Json(event): Json<IncomingEvent>,
) -> ApiResult<EventAcceptedResponse> {
    let record = CollectedEvent {
        event_id: Uuid::new_v4().to_string(),
        user_id: event.user_id,
        event_ts: epoch_ms().unwrap_or_default(),
        event_type: event.event_type,
        action: event.action,
        info: event.info,
    };

    if let Err(err) = state.events.append_event(&record) {
        error!("failed to record event {}: {:#}", record.event_id, err);
        return Err(internal_error(err));
    }

    info!(
        "collected {} '{}' from user {} (event {})",
        record.event_type, record.action, record.user_id, record.event_id
    );

    Ok(Json(EventAcceptedResponse {
        event_id: record.event_id,
    }))
}

pub(crate) async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> ApiResult<EventListResponse> {
    let filter = EventFilter {
        limit: query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT),
        event_type: query.event_type.filter(|value| !value.trim().is_empty()),
        user_id: query.user_id,
    };

    let events = state.events.list_events(&filter).map_err(internal_error)?;
    Ok(Json(EventListResponse { events }))
}
