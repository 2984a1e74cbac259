//! Creates the commerce schema in the configured database.

use anyhow::Context;
use clap::Parser;

use commerce_orders::postgres::{self, schema};
use commerce_orders::{telemetry, Config};

/// Create the order tables in the database named by `DATABASE_URL` / `DB_*`.
#[derive(Debug, Parser)]
#[command(name = "orders-migrate", version)]
struct Args {
    /// Drop every table before creating the schema
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    telemetry::init(&config.logger);

    let pool = postgres::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    if args.reset {
        schema::drop_tables(&pool)
            .await
            .context("failed to drop tables")?;
        tracing::warn!("Dropped existing tables");
    }

    schema::create_tables(&pool)
        .await
        .context("failed to create tables")?;
    tracing::info!(reset = args.reset, "Schema is up to date");

    pool.close().await;
    Ok(())
}
