use crate::error::StoreError;
use crate::models::NewEvent;
use crate::services::inventory_store::InventoryStore;

fn sample_events() -> Vec<NewEvent> {
    [
        ("Clemson Football Game", "2030-09-06", 250),
        ("Campus Jazz Night", "2030-09-19", 80),
        ("Homecoming Concert", "2030-10-24", 500),
        ("Tiger Paw Film Festival", "2030-11-14", 120),
    ]
    .into_iter()
    .map(|(name, date, tickets)| NewEvent {
        name: name.to_string(),
        date: date.to_string(),
        tickets_available: tickets,
    })
    .collect()
}

/// Insert a handful of events when the inventory is empty. Returns how many were added.
pub fn seed_sample_events(store: &dyn InventoryStore) -> Result<usize, StoreError> {
    if !store.list_events()?.is_empty() {
        tracing::info!("Database already has events, skipping seed");
        return Ok(0);
    }

    let samples = sample_events();
    for event in &samples {
        store.create_event(event)?;
    }

    tracing::info!("Seeded {} sample events", samples.len());
    Ok(samples.len())
}
