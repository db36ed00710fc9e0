// Library root - exports for the server binary, tools and tests

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use config::Config;
pub use router::build_router;

use services::{InventoryStore, ReservationEngine};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub engine: Arc<ReservationEngine>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn InventoryStore>, config: Arc<Config>) -> Self {
        let engine = Arc::new(ReservationEngine::new(
            Arc::clone(&store),
            config.retry_policy(),
        ));
        Self {
            store,
            engine,
            config,
        }
    }
}
