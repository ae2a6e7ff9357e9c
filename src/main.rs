use clap::{Parser, Subcommand};
use landed_cost::{
    config::Config, db::init_db, AppError, CostingService, Repository, ShipmentId,
    ShipmentRecord,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Landed-cost allocation for import shipments.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a shipment record read from a JSON file.
    Load {
        /// Path to the shipment record.
        file: PathBuf,
    },
    /// Compute and commit a shipment's landed costs; prints the result.
    Compute {
        /// Shipment identifier.
        shipment_id: String,
    },
    /// Show how a shipment's shared costs would be split, without writing.
    Preview {
        /// Shipment identifier.
        shipment_id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<(), AppError> {
    let pool = init_db(&config.database_path).await?;
    let repo = Arc::new(Repository::new(pool));
    let service = CostingService::new(repo.clone(), config.costing_policy());

    match command {
        Commands::Load { file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let record: ShipmentRecord = serde_json::from_str(&content)?;
            record.validate()?;
            repo.insert_shipment_record(&record).await?;
            tracing::info!(
                shipment_id = %record.shipment.id,
                file = %file.display(),
                "Shipment loaded"
            );
            println!("{}", record.shipment.id);
        }
        Commands::Compute { shipment_id } => {
            let id = parse_id(&shipment_id)?;
            print_json(&service.compute(&id).await?)?;
        }
        Commands::Preview { shipment_id } => {
            let id = parse_id(&shipment_id)?;
            print_json(&service.preview_consolidation(&id).await?)?;
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<ShipmentId, AppError> {
    raw.parse::<ShipmentId>()
        .map_err(|e| AppError::BadRequest(format!("invalid shipment id {}: {}", raw, e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
