// Reservation engine against a mocked store: attempt counting, rollback on every exit path.

use chrono::Utc;
use mockall::mock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tigertix_api::error::{ReservationError, StoreError};
use tigertix_api::models::{Booking, Event, EventId, NewEvent};
use tigertix_api::services::{
    InventorySession, InventoryStore, PurchaseOutcome, ReservationEngine, RetryPolicy,
};

mock! {
    pub Store {}

    impl InventoryStore for Store {
        fn begin_exclusive(&self) -> Result<Box<dyn InventorySession>, StoreError>;
        fn list_events(&self) -> Result<Vec<Event>, StoreError>;
        fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError>;
        fn create_event(&self, event: &NewEvent) -> Result<Event, StoreError>;
        fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>, StoreError>;
    }
}

#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone, Copy)]
enum Step {
    Ok,
    Busy,
    Fault,
}

impl Step {
    fn run(self) -> Result<(), StoreError> {
        match self {
            Step::Ok => Ok(()),
            Step::Busy => Err(StoreError::Busy),
            Step::Fault => Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows)),
        }
    }
}

struct FakeSession {
    log: CallLog,
    rows_changed: usize,
    stored: Option<Event>,
    on_decrement: Step,
    on_commit: Step,
}

impl FakeSession {
    fn new(log: &CallLog, rows_changed: usize, stored: Option<Event>) -> Self {
        Self {
            log: log.clone(),
            rows_changed,
            stored,
            on_decrement: Step::Ok,
            on_commit: Step::Ok,
        }
    }
}

impl InventorySession for FakeSession {
    fn conditional_decrement(&mut self, _event_id: EventId, _qty: u32) -> Result<usize, StoreError> {
        self.log.push("decrement");
        self.on_decrement.run()?;
        Ok(self.rows_changed)
    }

    fn get(&mut self, _event_id: EventId) -> Result<Option<Event>, StoreError> {
        self.log.push("get");
        Ok(self.stored.clone())
    }

    fn insert_booking(&mut self, event_id: EventId, qty: u32) -> Result<Booking, StoreError> {
        self.log.push("insert_booking");
        Ok(Booking {
            id: 1,
            event_id,
            qty,
            created_at: Utc::now(),
        })
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.log.push("commit");
        self.on_commit.run()
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.log.push("rollback");
        Ok(())
    }
}

fn event(tickets: i64) -> Event {
    Event {
        id: 1,
        name: "Mocked Event".to_string(),
        date: "2030-01-01".to_string(),
        tickets_available: tickets,
    }
}

fn engine(store: MockStore) -> ReservationEngine {
    ReservationEngine::new(Arc::new(store), RetryPolicy::linear(3, Duration::from_millis(1)))
}

#[tokio::test]
async fn test_lock_never_granted_gives_busy_after_three_attempts() {
    let mut store = MockStore::new();
    store
        .expect_begin_exclusive()
        .times(3)
        .returning(|| Err(StoreError::Busy));

    let outcome = engine(store).purchase(1, 1).await.unwrap();

    assert_eq!(outcome, PurchaseOutcome::Busy { attempts: 3 });
}

#[tokio::test]
async fn test_unexpected_fault_is_rolled_back_and_not_retried() {
    let log = CallLog::default();
    let mut store = MockStore::new();
    let session_log = log.clone();
    store.expect_begin_exclusive().times(1).returning(move || {
        let mut session = FakeSession::new(&session_log, 0, None);
        session.on_decrement = Step::Fault;
        Ok(Box::new(session) as Box<dyn InventorySession>)
    });

    let result = engine(store).purchase(1, 1).await;

    assert!(matches!(result, Err(ReservationError::Unexpected(StoreError::Sqlite(_)))));
    assert_eq!(log.calls(), vec!["decrement", "rollback"]);
}

#[tokio::test]
async fn test_fault_on_begin_is_not_retried() {
    let mut store = MockStore::new();
    store
        .expect_begin_exclusive()
        .times(1)
        .returning(|| Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows)));

    let result = engine(store).confirm_booking(1, 2).await;

    assert!(matches!(result, Err(ReservationError::Unexpected(_))));
}

#[tokio::test]
async fn test_busy_mid_transaction_is_rolled_back_and_retried() {
    let log = CallLog::default();
    let mut store = MockStore::new();
    let session_log = log.clone();
    let mut opened = 0;
    store.expect_begin_exclusive().times(2).returning(move || {
        opened += 1;
        let mut session = FakeSession::new(&session_log, 1, Some(event(4)));
        if opened == 1 {
            session.on_decrement = Step::Busy;
        }
        Ok(Box::new(session) as Box<dyn InventorySession>)
    });

    let outcome = engine(store).purchase(1, 1).await.unwrap();

    assert_eq!(
        outcome,
        PurchaseOutcome::Success {
            event: event(4),
            booking: None
        }
    );
    assert_eq!(
        log.calls(),
        vec!["decrement", "rollback", "decrement", "get", "commit"]
    );
}

#[tokio::test]
async fn test_busy_on_commit_is_retried() {
    let log = CallLog::default();
    let mut store = MockStore::new();
    let session_log = log.clone();
    let mut opened = 0;
    store.expect_begin_exclusive().times(2).returning(move || {
        opened += 1;
        let mut session = FakeSession::new(&session_log, 1, Some(event(2)));
        if opened == 1 {
            session.on_commit = Step::Busy;
        }
        Ok(Box::new(session) as Box<dyn InventorySession>)
    });

    let outcome = engine(store).confirm_booking(1, 1).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        log.calls(),
        vec![
            "decrement",
            "insert_booking",
            "get",
            "commit",
            "decrement",
            "insert_booking",
            "get",
            "commit"
        ]
    );
}

#[tokio::test]
async fn test_zero_rows_on_missing_event_rolls_back_as_not_found() {
    let log = CallLog::default();
    let mut store = MockStore::new();
    let session_log = log.clone();
    store
        .expect_begin_exclusive()
        .times(1)
        .returning(move || Ok(Box::new(FakeSession::new(&session_log, 0, None)) as Box<dyn InventorySession>));

    let outcome = engine(store).confirm_booking(1, 1).await.unwrap();

    assert_eq!(outcome, PurchaseOutcome::NotFound);
    assert_eq!(log.calls(), vec!["decrement", "get", "rollback"]);
}

#[tokio::test]
async fn test_zero_rows_on_existing_event_rolls_back_as_insufficient_stock() {
    let log = CallLog::default();
    let mut store = MockStore::new();
    let session_log = log.clone();
    store.expect_begin_exclusive().times(1).returning(move || {
        Ok(Box::new(FakeSession::new(&session_log, 0, Some(event(1)))) as Box<dyn InventorySession>)
    });

    let outcome = engine(store).purchase(1, 3).await.unwrap();

    assert_eq!(outcome, PurchaseOutcome::InsufficientStock { available: 1 });
    assert_eq!(log.calls(), vec!["decrement", "get", "rollback"]);
}

#[tokio::test]
async fn test_invalid_request_never_opens_a_transaction() {
    let mut store = MockStore::new();
    store.expect_begin_exclusive().never();

    let result = engine(store).purchase(1, 0).await;

    assert!(matches!(result, Err(ReservationError::InvalidRequest(_))));
}
