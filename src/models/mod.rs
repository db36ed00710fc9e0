//! Shared types: inventory rows, booking audit rows, id aliases.

pub mod event;
pub mod ids;

pub use event::{Booking, Event, NewEvent};
pub use ids::{BookingId, EventId};
