use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::{api_error, reservation_error, settle, ApiError};
use crate::models::{Booking, EventId};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmBookingRequest {
    pub event_id: Option<i64>,
    pub qty: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmBookingResponse {
    pub ok: bool,
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    pub event_name: String,
    pub tickets: u32,
    pub remaining: i64,
    pub booking: Booking,
}

/// Book `qty` tickets proposed by the chat assistant and record the booking.
pub async fn confirm_booking(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmBookingRequest>, JsonRejection>,
) -> Result<Json<ConfirmBookingResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        api_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e.body_text()))
    })?;

    let event_id = payload
        .event_id
        .filter(|id| *id > 0)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "event_id must be a positive integer"))?;
    let qty = payload
        .qty
        .filter(|qty| *qty > 0)
        .and_then(|qty| u32::try_from(qty).ok())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "qty must be a positive integer"))?;

    let outcome = state
        .engine
        .confirm_booking(event_id, qty)
        .await
        .map_err(reservation_error)?;

    let (event, booking) = settle(outcome)?;
    let booking = booking.ok_or_else(|| {
        tracing::error!("Confirmed booking for event {} returned no audit row", event_id);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
    })?;

    Ok(Json(ConfirmBookingResponse {
        ok: true,
        event_id: event.id,
        event_name: event.name,
        tickets: qty,
        remaining: event.tickets_available,
        booking,
    }))
}
