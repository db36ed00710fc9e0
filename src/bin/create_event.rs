// Insert an event row directly into the inventory database.
// Usage: cargo run --bin create_event -- --name "Spring Concert" --date 2031-04-10 --tickets 200

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tigertix_api::database::{self, DatabaseConfig};
use tigertix_api::models::NewEvent;
use tigertix_api::services::{InventoryStore, SqliteInventoryStore};

#[derive(Parser, Debug)]
#[command(about = "Create an event with an initial ticket count")]
struct Args {
    /// SQLite file; defaults to DATABASE_PATH or shared-db/database.sqlite
    #[arg(long, env = "DATABASE_PATH", default_value = "shared-db/database.sqlite")]
    db: PathBuf,

    #[arg(long)]
    name: String,

    /// Event date, e.g. 2031-04-10
    #[arg(long)]
    date: String,

    #[arg(long)]
    tickets: u32,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    if args.name.trim().is_empty() {
        anyhow::bail!("--name must not be empty");
    }

    let db = DatabaseConfig::new(args.db, Duration::from_secs(1));
    database::run_migrations(&db)?;
    let store = SqliteInventoryStore::new(db);

    let event = store.create_event(&NewEvent {
        name: args.name,
        date: args.date,
        tickets_available: i64::from(args.tickets),
    })?;

    println!("Created event {}: {} on {} ({} tickets)", event.id, event.name, event.date, event.tickets_available);
    Ok(())
}
