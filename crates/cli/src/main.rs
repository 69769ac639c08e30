//! Case Outcome Predictor CLI
//!
//! A command-line tool for requesting case outcome predictions, inspecting
//! the loaded model and checking how a request resolves against a model's
//! feature schema.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, resolve, service, CaseArgs};
use std::path::PathBuf;

/// Case Outcome Predictor CLI
#[derive(Parser)]
#[command(name = "casectl")]
#[command(author, version, about = "CLI for the Case Outcome Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CASECTL_API_URL env var)
    #[arg(long, env = "CASECTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the outcome of a case
    Predict {
        #[command(flatten)]
        case: CaseArgs,
    },

    /// Show the loaded model and its features
    Model,

    /// Show service health and readiness
    Health,

    /// Resolve a case into a feature vector using a local model file
    Resolve {
        /// Model artifact (.json forest or .onnx)
        #[arg(long, short)]
        model: PathBuf,

        /// Expected SHA256 of the model artifact
        #[arg(long)]
        checksum: Option<String>,

        /// Also run the model on the resolved vector
        #[arg(long)]
        predict: bool,

        #[command(flatten)]
        case: CaseArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format);

    let api_url = cli.api_url;
    let connect = || client::ApiClient::new(&config.resolve_api_url(api_url.clone()));

    match cli.command {
        Commands::Predict { case } => {
            predict::predict(&connect()?, &case.into(), format).await?;
        }
        Commands::Model => service::show_model(&connect()?, format).await?,
        Commands::Health => service::show_health(&connect()?, format).await?,
        Commands::Resolve {
            model,
            checksum,
            predict,
            case,
        } => {
            resolve::resolve(model, checksum, &case.into(), predict, format)?;
        }
    }

    Ok(())
}
