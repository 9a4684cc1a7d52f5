mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use rateshop_store::PgRateStore;

#[derive(Debug, Parser)]
#[command(name = "rateshop-cli")]
#[command(about = "Rate Shopper command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a rate workbook for a property.
    Import {
        /// Path to the `.xlsx`/`.xls` workbook.
        file: PathBuf,
        /// Id of the property the rates belong to.
        #[arg(long)]
        property_id: i64,
    },
    /// Compare a property against its tracked competitors.
    Compare {
        #[arg(long)]
        property_id: i64,
        /// Period start, `YYYY-MM-DD`.
        #[arg(long)]
        start: NaiveDate,
        /// Period end, `YYYY-MM-DD`.
        #[arg(long)]
        end: NaiveDate,
        /// Print the full report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Manage tracked properties.
    Properties {
        #[command(subcommand)]
        command: PropertiesCommand,
    },
    /// Print workspace totals.
    Stats,
}

#[derive(Debug, Subcommand)]
enum PropertiesCommand {
    /// List registered properties.
    List,
    /// Register a property.
    Add {
        name: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        booking_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let pool = rateshop_store::connect_pool_from_env().await?;
    let applied = rateshop_store::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }
    let store = PgRateStore::new(pool);

    match cli.command {
        Commands::Import { file, property_id } => {
            commands::run_import(&store, &file, property_id).await
        }
        Commands::Compare {
            property_id,
            start,
            end,
            json,
        } => commands::run_compare(&store, property_id, start, end, json).await,
        Commands::Properties { command } => match command {
            PropertiesCommand::List => commands::run_properties_list(&store).await,
            PropertiesCommand::Add {
                name,
                location,
                booking_url,
            } => commands::run_properties_add(&store, name, location, booking_url).await,
        },
        Commands::Stats => commands::run_stats(&store).await,
    }
}
