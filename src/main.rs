//! Keiba Gacha
//!
//! Scrapes the entrants of the day's final race at a local (NAR) venue and
//! spins a gacha over their names. Serves the result over HTTP or the CLI.

mod cli;
mod config;
mod error;
mod gacha;
mod pipeline;
mod routes;
mod scraper;
mod storage;
mod types;

use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::pipeline::LivePipeline;
use crate::routes::AppState;
use crate::storage::NameStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keiba_gacha=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { host, port } => run_server(host, port).await,
        Commands::Scrape { date } => cli::run_scrape(date).await,
        Commands::Gacha {
            source,
            date,
            names,
        } => cli::run_gacha(source, date, names).await,
        Commands::Store { action } => cli::run_store(action),
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    tracing::info!(
        "Venue: {} ({}), marker: {}",
        config.venue.label,
        config.venue.code,
        config.venue.final_race_marker
    );

    let pipeline = LivePipeline::from_config(&config)?;

    tracing::info!("Opening name store: {}", config.storage.db_path);
    let store = NameStore::open(Path::new(&config.storage.db_path))?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create application state
    let state = Arc::new(AppState {
        config,
        pipeline,
        store: Mutex::new(store),
    });

    let app = routes::router(state);

    // Start server
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
