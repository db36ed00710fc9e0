//! Durable ticket counters and the transactional primitives the reservation engine drives.
//!
//! A session is one exclusive transaction on one freshly opened connection. It is never
//! shared between purchase calls and never reused after it commits or rolls back.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::database::{open_connection, DatabaseConfig};
use crate::error::StoreError;
use crate::models::{Booking, BookingId, Event, EventId, NewEvent};

/// An open exclusive transaction.
///
/// Implementations must leave no partial writes behind when `commit` fails or when the
/// session is dropped without being finished.
pub trait InventorySession: Send {
    /// `ticketsAvailable -= qty` where `id = event_id AND ticketsAvailable >= qty`.
    /// Returns the number of rows changed, 0 or 1.
    fn conditional_decrement(&mut self, event_id: EventId, qty: u32) -> Result<usize, StoreError>;

    fn get(&mut self, event_id: EventId) -> Result<Option<Event>, StoreError>;

    /// Append an audit row and read it back.
    fn insert_booking(&mut self, event_id: EventId, qty: u32) -> Result<Booking, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

pub trait InventoryStore: Send + Sync {
    /// Take the write lock before any read. Fails with [`StoreError::Busy`] when the lock
    /// is not granted within the store's bounded wait.
    fn begin_exclusive(&self) -> Result<Box<dyn InventorySession>, StoreError>;

    fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError>;

    fn create_event(&self, event: &NewEvent) -> Result<Event, StoreError>;

    fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>, StoreError>;
}

#[derive(Clone, Debug)]
pub struct SqliteInventoryStore {
    db: DatabaseConfig,
}

impl SqliteInventoryStore {
    pub fn new(db: DatabaseConfig) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.db
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(open_connection(&self.db)?)
    }
}

impl InventoryStore for SqliteInventoryStore {
    fn begin_exclusive(&self) -> Result<Box<dyn InventorySession>, StoreError> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(Box::new(SqliteSession { conn }))
    }

    fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, date, ticketsAvailable FROM events ORDER BY date ASC, id ASC",
        )?;
        let events = stmt
            .query_map([], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        let conn = self.connect()?;
        select_event(&conn, event_id)
    }

    fn create_event(&self, event: &NewEvent) -> Result<Event, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO events (name, date, ticketsAvailable) VALUES (?1, ?2, ?3)",
            params![event.name.trim(), event.date, event.tickets_available],
        )?;
        let id = conn.last_insert_rowid();
        select_event(&conn, id)?.ok_or(StoreError::MissingEvent(id))
    }

    fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, event_id, qty, createdAt FROM bookings WHERE event_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![event_id], raw_booking_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawBooking::into_booking).collect()
    }
}

pub struct SqliteSession {
    conn: Connection,
}

impl InventorySession for SqliteSession {
    fn conditional_decrement(&mut self, event_id: EventId, qty: u32) -> Result<usize, StoreError> {
        let changed = self.conn.execute(
            "UPDATE events SET ticketsAvailable = ticketsAvailable - ?1 \
             WHERE id = ?2 AND ticketsAvailable >= ?1",
            params![qty, event_id],
        )?;
        Ok(changed)
    }

    fn get(&mut self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        select_event(&self.conn, event_id)
    }

    fn insert_booking(&mut self, event_id: EventId, qty: u32) -> Result<Booking, StoreError> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.conn.execute(
            "INSERT INTO bookings (event_id, qty, createdAt) VALUES (?1, ?2, ?3)",
            params![event_id, qty, created_at],
        )?;
        let id = self.conn.last_insert_rowid();
        let raw = self.conn.query_row(
            "SELECT id, event_id, qty, createdAt FROM bookings WHERE id = ?1",
            params![id],
            raw_booking_from_row,
        )?;
        raw.into_booking()
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        // On failure the transaction stays open and Drop rolls it back.
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK;") {
            tracing::warn!("Rollback of abandoned inventory session failed: {:?}", e);
        }
    }
}

fn select_event(conn: &Connection, event_id: EventId) -> Result<Option<Event>, StoreError> {
    let event = conn
        .query_row(
            "SELECT id, name, date, ticketsAvailable FROM events WHERE id = ?1",
            params![event_id],
            event_from_row,
        )
        .optional()?;
    Ok(event)
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        tickets_available: row.get(3)?,
    })
}

struct RawBooking {
    id: BookingId,
    event_id: EventId,
    qty: u32,
    created_at: String,
}

impl RawBooking {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| StoreError::InvalidTimestamp {
                id: self.id,
                value: self.created_at.clone(),
            })?
            .with_timezone(&Utc);
        Ok(Booking {
            id: self.id,
            event_id: self.event_id,
            qty: self.qty,
            created_at,
        })
    }
}

fn raw_booking_from_row(row: &Row<'_>) -> rusqlite::Result<RawBooking> {
    Ok(RawBooking {
        id: row.get(0)?,
        event_id: row.get(1)?,
        qty: row.get(2)?,
        created_at: row.get(3)?,
    })
}
