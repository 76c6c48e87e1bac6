use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use rental_api::{config, db, migrator::Migrator};

/// Applies or rolls back the rental schema.
#[derive(Debug, Parser)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up,
    /// Roll back migrations
    Down {
        /// How many to roll back; all when omitted
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("info", false);

    let database_url = match cli.database_url {
        Some(url) => url,
        None => config::load_config()
            .context("failed to load configuration")?
            .database_url,
    };
    info!("Connecting to database");
    let pool = db::establish_connection(&database_url)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            db::run_migrations(&pool).await?;
        }
        Command::Down { steps } => {
            Migrator::down(&pool, steps)
                .await
                .context("rollback failed")?;
            info!(steps = ?steps, "Rollback completed");
        }
        Command::Fresh => {
            Migrator::fresh(&pool)
                .await
                .context("fresh migration failed")?;
            info!("Schema recreated");
        }
        Command::Status => {
            Migrator::status(&pool)
                .await
                .context("failed to read migration status")?;
        }
    }

    Ok(())
}
