//! CLI commands for keiba-gacha.
//!
//! Supports API server mode, one-shot scraping, the gacha itself, and
//! managing the named store.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use crate::config::AppConfig;
use crate::gacha::SelectionAnimator;
use crate::pipeline::{AcquisitionResult, LivePipeline};
use crate::storage::NameStore;
use crate::types::ScrapeResponse;

#[derive(Parser)]
#[command(name = "keiba-gacha")]
#[command(version, about = "Keiba gacha: spin over today's final-race entrants", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Scrape the final race's entrants once and print the result as JSON
    Scrape {
        /// Meeting date (YYYY-MM-DD); defaults to today at the venue
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Spin the gacha
    Gacha {
        /// Where entrant names come from when none are given
        #[arg(short, long, value_enum, default_value_t = Source::Scrape)]
        source: Source,

        /// Meeting date for --source scrape (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Explicit entrant names
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },

    /// Manage the named store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Today's final race on netkeiba
    Scrape,
    /// The named store
    Store,
}

#[derive(Subcommand)]
pub enum StoreAction {
    /// Add names to the store
    Add {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },
    /// List stored names
    List,
}

async fn acquire(config: &AppConfig, date: Option<NaiveDate>) -> anyhow::Result<AcquisitionResult> {
    let pipeline = LivePipeline::from_config(config)?;
    Ok(match date {
        Some(date) => pipeline.run(date).await,
        None => pipeline.run_today().await,
    })
}

/// Run one acquisition and print the API-shaped result.
pub async fn run_scrape(date: Option<NaiveDate>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let result = acquire(&config, date).await?;

    let response = ScrapeResponse::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Gather entrants, spin, and print the settled name.
pub async fn run_gacha(source: Source, date: Option<NaiveDate>, names: Vec<String>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    let entrants = if !names.is_empty() {
        names
    } else {
        match source {
            Source::Scrape => match acquire(&config, date).await? {
                AcquisitionResult::Success(entrants) => entrants,
                AcquisitionResult::Failure { message, .. } => anyhow::bail!(message),
            },
            Source::Store => {
                let store = NameStore::open(Path::new(&config.storage.db_path))?;
                let names = store.project_field(&config.storage.collection, &config.storage.field)?;
                if names.is_empty() {
                    anyhow::bail!("No names in collection '{}'", config.storage.collection);
                }
                names
            }
        }
    };

    eprintln!("Entrants: {}", entrants.len());

    let mut gacha = SelectionAnimator::from_config(&config.gacha)?;
    let mut rx = gacha.subscribe();
    gacha.start(entrants)?;

    let mut stdout = std::io::stdout();
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if !snapshot.rolling {
            break;
        }
        if let Some(name) = snapshot.current {
            write!(stdout, "\r\x1b[2K{}", name)?;
            stdout.flush()?;
        }
    }

    let winner = gacha
        .settled()
        .await
        .ok_or_else(|| anyhow::anyhow!("Gacha stopped before picking a name"))?;
    writeln!(stdout, "\r\x1b[2K🎉 {}", winner)?;
    tracing::debug!(ticks = gacha.snapshot().ticks, "Gacha finished");
    Ok(())
}

/// Add to or list the named store.
pub fn run_store(action: StoreAction) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let storage = &config.storage;
    let store = NameStore::open(Path::new(&storage.db_path))?;

    match action {
        StoreAction::Add { names } => {
            for name in &names {
                store.insert(&storage.collection, &json!({ storage.field.as_str(): name }))?;
            }
            eprintln!(
                "Added {} name(s); '{}' now holds {}",
                names.len(),
                storage.collection,
                store.count(&storage.collection)?
            );
        }
        StoreAction::List => {
            for name in store.project_field(&storage.collection, &storage.field)? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
