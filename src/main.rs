//! vapi-bridge CLI
//!
//! Thin command-line front end over the VAPI service façade.
//!
//! # Usage
//! ```sh
//! VAPI_API_KEY=... cargo run -- health
//! VAPI_API_KEY=... cargo run -- list calls --limit 20
//! VAPI_API_KEY=... cargo run -- fetch-all assistants calls phoneNumbers
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;
use vapi_bridge::application::VapiService;
use vapi_bridge::config::Config;
use vapi_bridge::domain::resource::{ListParams, ResourceKind};
use vapi_bridge::infrastructure::ClientMetrics;

#[derive(Parser)]
#[command(author, version, about = "Resilient VAPI API client", long_about = None)]
struct Cli {
    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API is reachable and report latency
    Health,
    /// List a resource collection (assistants, calls, phoneNumbers, squads, tools, files)
    List {
        kind: String,

        #[arg(short, long, default_value = "100")]
        limit: u32,

        #[arg(short, long)]
        offset: Option<u32>,
    },
    /// Fetch a single resource by id
    Get { kind: String, id: String },
    /// Fetch several collections concurrently, reporting each independently
    FetchAll {
        #[arg(required = true)]
        kinds: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let log_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(log_layer)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.require_api_key()?;
    let client_config = config.client_config();
    info!(
        "vapi-bridge {} targeting {}",
        env!("CARGO_PKG_VERSION"),
        client_config.base_url
    );

    let metrics = if config.observability_enabled {
        Some(ClientMetrics::new().context("Failed to create metrics")?)
    } else {
        None
    };

    let service = VapiService::new(&client_config, metrics.clone())
        .context("Failed to build VAPI client")?;

    match cli.command {
        Commands::Health => {
            let report = service.health_check().await;
            print_json(&report)?;
            if !report.is_healthy() {
                print_metrics(cli.metrics, metrics.as_ref());
                std::process::exit(1);
            }
        }
        Commands::List {
            kind,
            limit,
            offset,
        } => {
            let kind: ResourceKind = kind.parse()?;
            let params = ListParams {
                limit: Some(limit),
                offset,
            };
            let data = service
                .list_resource_page(kind, params)
                .await
                .with_context(|| format!("Failed to list {}", kind))?;
            print_json(&data)?;
        }
        Commands::Get { kind, id } => {
            let kind: ResourceKind = kind.parse()?;
            let data = service
                .get_resource(kind, &id)
                .await
                .with_context(|| format!("Failed to fetch {} {}", kind, id))?;
            print_json(&data)?;
        }
        Commands::FetchAll { kinds } => {
            let results = service.fan_out_fetch(kinds.as_slice()).await;
            print_json(&results)?;
        }
    }

    print_metrics(cli.metrics, metrics.as_ref());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn print_metrics(requested: bool, metrics: Option<&ClientMetrics>) {
    if let (true, Some(metrics)) = (requested, metrics) {
        println!("{}", metrics.render());
    }
}
