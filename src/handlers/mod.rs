pub mod bookings;
pub mod events;

pub use bookings::{confirm_booking, ConfirmBookingRequest, ConfirmBookingResponse};
pub use events::{get_event, list_events, purchase_ticket};

use axum::{http::StatusCode, response::Json};

use crate::error::{ReservationError, StoreError};
use crate::models::{Booking, Event};
use crate::services::{InventoryStore, PurchaseOutcome};
use crate::AppState;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": error.into() })))
}

/// Split a purchase outcome into the sold tickets or the response for a rejected purchase.
pub(crate) fn settle(outcome: PurchaseOutcome) -> Result<(Event, Option<Booking>), ApiError> {
    match outcome {
        PurchaseOutcome::Success { event, booking } => Ok((event, booking)),
        PurchaseOutcome::NotFound => Err(api_error(StatusCode::NOT_FOUND, "EVENT_NOT_FOUND")),
        PurchaseOutcome::InsufficientStock { .. } => {
            Err(api_error(StatusCode::CONFLICT, "INSUFFICIENT_TICKETS"))
        }
        PurchaseOutcome::Busy { .. } => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "DB_BUSY")),
    }
}

// Fault details are logged by the engine and never sent to the client.
pub(crate) fn reservation_error(err: ReservationError) -> ApiError {
    match err {
        ReservationError::InvalidRequest(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        ReservationError::Task(e) => {
            tracing::error!("Purchase task failed: {:?}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
        ReservationError::Unexpected(_) => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

/// Run a read against the store off the async runtime.
pub(crate) async fn read_store<T, F>(state: &AppState, read: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn InventoryStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || read(store.as_ref()))
        .await
        .map_err(|e| {
            tracing::error!("Store read task failed: {:?}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        })?;

    result.map_err(|e| match e {
        StoreError::Busy => api_error(StatusCode::SERVICE_UNAVAILABLE, "DB_BUSY"),
        other => {
            tracing::error!("Error reading inventory: {:?}", other);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    })
}
