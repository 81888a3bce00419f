// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use qdrant_collection::commands::{self, RunSummary};
use qdrant_collection::config::StoreConfig;
use qdrant_collection::core::snapshot::DEFAULT_SNAPSHOT_KEEP;
use qdrant_collection::core::{ClientRegistry, Collection};
use qdrant_collection::types::SnapshotPriority;

#[derive(Parser)]
#[command(name = "qdrant-snapshot", about = "Manage vector collection snapshots")]
struct Args {
    /// Collection to operate on (repeatable)
    #[arg(short, long = "collection", required = true)]
    collections: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show collection status and schema
    Info,
    /// List snapshots, newest first
    List,
    /// Create a snapshot of every collection
    Create,
    /// Remove one snapshot of a single collection
    Remove { snapshot: String },
    /// Delete all but the newest snapshots
    Clean {
        #[arg(long, default_value_t = DEFAULT_SNAPSHOT_KEEP)]
        keep: usize,
    },
    /// Restore the newest snapshot, or a named one of a single collection
    Restore {
        #[arg(long)]
        snapshot: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Snapshot)]
        priority: Priority,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Priority {
    Snapshot,
    Replica,
    NoSync,
}

impl From<Priority> for SnapshotPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Snapshot => SnapshotPriority::Snapshot,
            Priority::Replica => SnapshotPriority::Replica,
            Priority::NoSync => SnapshotPriority::NoSync,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qdrant_collection=info,qdrant_snapshot=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = StoreConfig::from_env()?;
    info!("Connecting to vector store at {}", config.base_url());

    let registry = ClientRegistry::new(config);
    let result = run(&registry, args).await;
    registry.shutdown().await;
    result
}

async fn run(registry: &ClientRegistry, args: Args) -> Result<()> {
    match args.command {
        Command::Info => {
            for collection in commands::open_collections(registry, &args.collections).await? {
                let info = collection.get_info().await?;
                println!("{}", serde_json::to_string_pretty(&info)?);
            }
        }
        Command::List => {
            for collection in commands::open_collections(registry, &args.collections).await? {
                for snapshot in collection.list_snapshots().await? {
                    let created = snapshot
                        .creation_time
                        .map(|time| time.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{}\t{}\t{}\t{}", collection.name(), snapshot.name, created, snapshot.size);
                }
            }
        }
        Command::Create => {
            let collections = commands::open_collections(registry, &args.collections).await?;
            check(commands::create_snapshots(&collections).await, "Snapshot creation")?;
        }
        Command::Remove { snapshot } => {
            let collection = single(registry, &args.collections).await?;
            commands::remove_snapshot(&collection, &snapshot).await?;
        }
        Command::Clean { keep } => {
            let collections = commands::open_collections(registry, &args.collections).await?;
            check(commands::clean_snapshots(&collections, keep).await, "Snapshot cleaning")?;
        }
        Command::Restore { snapshot: Some(snapshot), priority } => {
            let collection = single(registry, &args.collections).await?;
            if !commands::restore_named_snapshot(&collection, &snapshot, priority.into()).await? {
                bail!("Snapshot {} restore failed", snapshot);
            }
        }
        Command::Restore { snapshot: None, priority } => {
            let collections = commands::open_collections(registry, &args.collections).await?;
            check(
                commands::restore_snapshots(&collections, priority.into()).await,
                "Snapshot restoration",
            )?;
        }
    }
    Ok(())
}

async fn single(registry: &ClientRegistry, names: &[String]) -> Result<Collection> {
    match names {
        [name] => Ok(Collection::attach(registry, name).await?),
        _ => bail!("Exactly one collection is required for this command"),
    }
}

fn check(summary: RunSummary, action: &str) -> Result<()> {
    if summary.aborted() {
        bail!(
            "{} failed for: {}",
            action,
            summary
                .failed
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}
