pub mod inventory_store;
pub mod reservation;
pub mod retry;
pub mod seed_data;

pub use inventory_store::{InventorySession, InventoryStore, SqliteInventoryStore};
pub use reservation::{PurchaseOutcome, ReservationEngine};
pub use retry::RetryPolicy;
