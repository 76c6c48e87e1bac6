use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use rental_api::{
    auth::{AuthConfig, AuthService, Role},
    config::{self, AppConfig},
    db,
    services::bookings::{BookingFilter, BookingService, BookingStatusFilter},
};

/// Operator tooling for the rental back end.
#[derive(Debug, Parser)]
#[command(name = "rental-cli", version, about)]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign an access token, e.g. for the point-of-sale terminal
    Token {
        #[arg(long, value_enum, default_value_t = RoleArg::Customer)]
        role: RoleArg,
        /// Subject id; a new one is generated when omitted
        #[arg(long)]
        user_id: Option<Uuid>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List active bookings past their end date
    Overdue {
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Customer,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Customer => Role::Customer,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing("warn", false);

    match cli.command {
        Commands::Token {
            role,
            user_id,
            name,
            email,
        } => issue_token(&cfg, role.into(), user_id, name, email, cli.json),
        Commands::Overdue { limit } => list_overdue(&cfg, limit, cli.json).await,
    }
}

fn issue_token(
    cfg: &AppConfig,
    role: Role,
    user_id: Option<Uuid>,
    name: Option<String>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let auth = AuthService::new(AuthConfig::from(cfg));
    let user_id = user_id.unwrap_or_else(Uuid::new_v4);
    let token = auth
        .issue_token(user_id, role, name, email)
        .context("failed to sign token")?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "user_id": user_id, "role": role, "token": token })
        );
    } else {
        println!("user_id: {}", user_id);
        println!("role:    {}", role);
        println!("token:   {}", token);
    }
    Ok(())
}

async fn list_overdue(cfg: &AppConfig, limit: u64, json: bool) -> Result<()> {
    let pool = db::establish_connection_from_app_config(cfg)
        .await
        .context("failed to connect to database")?;
    let service = BookingService::new(Arc::new(pool), None);

    let filter = BookingFilter {
        status: Some(BookingStatusFilter::Overdue),
        user_id: None,
    };
    let (bookings, total) = service
        .list_bookings(filter, 1, limit)
        .await
        .context("failed to list overdue bookings")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bookings)?);
        return Ok(());
    }

    if bookings.is_empty() {
        println!("No overdue bookings");
        return Ok(());
    }
    println!("{} overdue booking(s)", total);
    for booking in bookings {
        println!(
            "{}  {:<24} {:<32} due {}  items {}",
            booking.id,
            booking.customer_name,
            booking.customer_email,
            booking.end_date.format("%Y-%m-%d"),
            booking.items.len()
        );
    }
    Ok(())
}
