//! Equipment RUL Predictor CLI
//!
//! A command-line tool for querying RUL predictions, triggering retrains,
//! and checking the health of the lifecycle service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, retrain, status};

/// Equipment RUL Predictor CLI
#[derive(Parser)]
#[command(name = "rul")]
#[command(author, version, about = "CLI for the Equipment RUL Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via RUL_API_URL env var)
    #[arg(long, env = "RUL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "plain")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict remaining useful life for one equipment
    Predict {
        /// Zone identifier
        #[arg(long, short)]
        zone: String,

        /// Equipment identifier
        #[arg(long, short)]
        equipment: String,
    },

    /// Trigger a retrain cycle
    Retrain {
        /// Target month (YYYY-MM); the service defaults to the current month
        #[arg(long)]
        month: Option<String>,

        /// Cap on balanced training rows, for quick runs
        #[arg(long)]
        sample: Option<usize>,
    },

    /// Show service health and the currently served model
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict { zone, equipment } => {
            predict::run(&client, &zone, &equipment, cli.format).await?;
        }
        Commands::Retrain { month, sample } => {
            retrain::run(&client, month, sample, cli.format).await?;
        }
        Commands::Status => {
            status::run(&client, cli.format).await?;
        }
    }

    Ok(())
}
