//! Purchase algorithm: guarded decrement inside an exclusive transaction, outcome
//! classification, and bounded retry of lock contention.
//!
//! Each attempt runs on a blocking thread with its own store session. Once an attempt has
//! started it always finishes with a commit or a rollback, even if the caller stops waiting.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{ReservationError, StoreError};
use crate::models::{Booking, Event, EventId};
use crate::services::inventory_store::{InventorySession, InventoryStore};
use crate::services::retry::RetryPolicy;

/// Result of a purchase that did not fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Tickets were taken. `booking` is present for confirmed bookings only.
    Success {
        event: Event,
        booking: Option<Booking>,
    },
    NotFound,
    /// The event exists but holds fewer than the requested tickets.
    InsufficientStock { available: i64 },
    /// Every attempt hit lock contention. Nothing was written.
    Busy { attempts: u32 },
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

pub struct ReservationEngine {
    store: Arc<dyn InventoryStore>,
    policy: RetryPolicy,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn InventoryStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Direct ticket purchase. No audit row is written.
    pub async fn purchase(
        &self,
        event_id: EventId,
        qty: u32,
    ) -> Result<PurchaseOutcome, ReservationError> {
        self.run(event_id, qty, false).await
    }

    /// Confirmed booking: same decrement, plus a `bookings` row in the same transaction.
    pub async fn confirm_booking(
        &self,
        event_id: EventId,
        qty: u32,
    ) -> Result<PurchaseOutcome, ReservationError> {
        self.run(event_id, qty, true).await
    }

    #[tracing::instrument(skip(self), fields(max_attempts = self.policy.max_attempts))]
    async fn run(
        &self,
        event_id: EventId,
        qty: u32,
        record_booking: bool,
    ) -> Result<PurchaseOutcome, ReservationError> {
        if event_id < 1 {
            return Err(ReservationError::InvalidRequest(
                "event_id must be a positive integer",
            ));
        }
        if qty == 0 {
            return Err(ReservationError::InvalidRequest(
                "qty must be a positive integer",
            ));
        }

        let mut attempt = 1;
        loop {
            debug!(attempt, "Opening exclusive inventory transaction");
            let store = Arc::clone(&self.store);
            let result = tokio::task::spawn_blocking(move || {
                attempt_purchase(store.as_ref(), event_id, qty, record_booking)
            })
            .await?;

            match result {
                Ok(outcome) => {
                    match &outcome {
                        PurchaseOutcome::Success { event, .. } => info!(
                            attempt,
                            remaining = event.tickets_available,
                            "Tickets purchased"
                        ),
                        other => debug!(attempt, outcome = ?other, "Purchase rejected"),
                    }
                    return Ok(outcome);
                }
                Err(StoreError::Busy) => match self.policy.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Inventory store busy, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(attempt, "Inventory store busy, giving up");
                        return Ok(PurchaseOutcome::Busy { attempts: attempt });
                    }
                },
                Err(err) => {
                    error!("Purchase failed with unexpected store error: {:?}", err);
                    return Err(ReservationError::Unexpected(err));
                }
            }
        }
    }
}

enum Decision {
    Commit {
        event: Event,
        booking: Option<Booking>,
    },
    Abort(PurchaseOutcome),
}

/// One purchase attempt on a fresh session.
///
/// Every path that does not commit rolls the session back before returning, including
/// faults raised mid-transaction.
pub fn attempt_purchase(
    store: &dyn InventoryStore,
    event_id: EventId,
    qty: u32,
    record_booking: bool,
) -> Result<PurchaseOutcome, StoreError> {
    let mut session = store.begin_exclusive()?;

    match decide(session.as_mut(), event_id, qty, record_booking) {
        Ok(Decision::Commit { event, booking }) => {
            session.commit()?;
            Ok(PurchaseOutcome::Success { event, booking })
        }
        Ok(Decision::Abort(outcome)) => {
            session.rollback()?;
            Ok(outcome)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback() {
                warn!("Rollback after failed purchase attempt also failed: {:?}", rollback_err);
            }
            Err(err)
        }
    }
}

fn decide(
    session: &mut dyn InventorySession,
    event_id: EventId,
    qty: u32,
    record_booking: bool,
) -> Result<Decision, StoreError> {
    if session.conditional_decrement(event_id, qty)? == 0 {
        // Same snapshot as the failed guard, so this tells missing apart from sold out.
        let outcome = match session.get(event_id)? {
            None => PurchaseOutcome::NotFound,
            Some(event) => PurchaseOutcome::InsufficientStock {
                available: event.tickets_available,
            },
        };
        return Ok(Decision::Abort(outcome));
    }

    let booking = if record_booking {
        Some(session.insert_booking(event_id, qty)?)
    } else {
        None
    };

    let event = session
        .get(event_id)?
        .ok_or(StoreError::MissingEvent(event_id))?;

    Ok(Decision::Commit { event, booking })
}
