use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::{api_error, read_store, reservation_error, settle, ApiError};
use crate::models::ids::parse_positive_id;
use crate::models::Event;
use crate::AppState;

pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    let events = read_store(&state, |store| store.list_events()).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let event_id =
        parse_positive_id(&id, "event id").map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    read_store(&state, move |store| store.get_event(event_id))
        .await?
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "EVENT_NOT_FOUND"))
}

/// Buy a single ticket. Responds with the updated event row.
pub async fn purchase_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let event_id =
        parse_positive_id(&id, "event id").map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let outcome = state
        .engine
        .purchase(event_id, 1)
        .await
        .map_err(reservation_error)?;

    let (event, _) = settle(outcome)?;
    Ok(Json(event))
}
