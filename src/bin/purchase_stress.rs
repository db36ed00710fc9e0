// Fire concurrent purchases at one event and print how they were resolved.
// Usage: cargo run --bin purchase_stress -- --event-id 1 --concurrency 12

use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tigertix_api::database::DatabaseConfig;
use tigertix_api::services::{
    InventoryStore, PurchaseOutcome, ReservationEngine, RetryPolicy, SqliteInventoryStore,
};

#[derive(Parser, Debug)]
#[command(about = "Concurrent purchase load against a single event")]
struct Args {
    #[arg(long, env = "DATABASE_PATH", default_value = "shared-db/database.sqlite")]
    db: PathBuf,

    #[arg(long)]
    event_id: i64,

    #[arg(long, default_value_t = 12)]
    concurrency: usize,

    #[arg(long, default_value_t = 1)]
    qty: u32,

    /// Record a booking row for every successful purchase
    #[arg(long)]
    confirm: bool,

    #[arg(long, default_value_t = 1000)]
    busy_timeout_ms: u64,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value_t = 50)]
    retry_base_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tigertix_api=warn".into()),
        )
        .init();

    let args = Args::parse();
    let db = DatabaseConfig::new(args.db.clone(), Duration::from_millis(args.busy_timeout_ms));
    let store: Arc<dyn InventoryStore> = Arc::new(SqliteInventoryStore::new(db));

    let before = store
        .get_event(args.event_id)?
        .ok_or_else(|| anyhow::anyhow!("event {} does not exist", args.event_id))?;

    let engine = Arc::new(ReservationEngine::new(
        store.clone(),
        RetryPolicy::linear(args.max_attempts, Duration::from_millis(args.retry_base_ms)),
    ));

    let started = Instant::now();
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..args.concurrency {
        let engine = engine.clone();
        let (event_id, qty, confirm) = (args.event_id, args.qty, args.confirm);
        tasks.spawn(async move {
            if confirm {
                engine.confirm_booking(event_id, qty).await
            } else {
                engine.purchase(event_id, qty).await
            }
        });
    }

    let mut tally: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut sold: i64 = 0;
    while let Some(joined) = tasks.join_next().await {
        let label = match joined? {
            Ok(PurchaseOutcome::Success { .. }) => {
                sold += i64::from(args.qty);
                "success"
            }
            Ok(PurchaseOutcome::NotFound) => "not_found",
            Ok(PurchaseOutcome::InsufficientStock { .. }) => "insufficient_stock",
            Ok(PurchaseOutcome::Busy { .. }) => "busy",
            Err(e) => {
                eprintln!("unexpected error: {}", e);
                "unexpected_error"
            }
        };
        *tally.entry(label).or_default() += 1;
    }

    let after = store
        .get_event(args.event_id)?
        .ok_or_else(|| anyhow::anyhow!("event {} disappeared", args.event_id))?;

    println!("{} purchases in {:?}", args.concurrency, started.elapsed());
    for (label, count) in &tally {
        println!("  {:<20} {}", label, count);
    }
    println!(
        "tickets: {} -> {} (sold {})",
        before.tickets_available, after.tickets_available, sold
    );

    if before.tickets_available - sold != after.tickets_available {
        anyhow::bail!("inventory mismatch: expected {} remaining", before.tickets_available - sold);
    }
    Ok(())
}
