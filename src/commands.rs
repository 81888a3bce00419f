// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Snapshot operations across several collections.
//!
//! Batch runs visit every collection even when some fail, and summarize the
//! outcome in a [`RunSummary`].

use std::future::Future;
use tracing::warn;

use crate::core::{ClientRegistry, Collection, CollectionError};
use crate::types::SnapshotPriority;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<String>,
    /// Collection name and failure message.
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    pub fn aborted(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Attaches to every named collection. Fails on the first one that does not
/// exist; nothing is created.
pub async fn open_collections(
    registry: &ClientRegistry,
    names: &[String],
) -> Result<Vec<Collection>, CollectionError> {
    let mut collections = Vec::with_capacity(names.len());
    for name in names {
        collections.push(Collection::attach(registry, name).await?);
    }
    Ok(collections)
}

async fn run_list<'a, F, Fut>(
    collections: &'a [Collection],
    action: &str,
    mut operation: F,
) -> RunSummary
where
    F: FnMut(&'a Collection) -> Fut,
    Fut: Future<Output = Result<bool, CollectionError>>,
{
    let mut summary = RunSummary::default();

    for collection in collections {
        let failure = match operation(collection).await {
            Ok(true) => {
                summary.completed.push(collection.name().to_string());
                continue;
            }
            Ok(false) => format!("{} did not complete", action),
            Err(e) => e.to_string(),
        };

        warn!(collection = %collection.name(), action, error = %failure, "Collection operation failed");
        collection
            .executor()
            .reporter()
            .warning(&format!("{} for {} failed: {}", action, collection.name(), failure));
        summary.failed.push((collection.name().to_string(), failure));
    }
    summary
}

pub async fn create_snapshots(collections: &[Collection]) -> RunSummary {
    run_list(collections, "Snapshot creation", |collection| async move {
        collection.create_snapshot().await?;
        Ok(true)
    })
    .await
}

pub async fn clean_snapshots(collections: &[Collection], keep: usize) -> RunSummary {
    run_list(collections, "Snapshot cleaning", |collection| async move {
        let cleaned = collection.clean_snapshots(keep).await?;
        if cleaned {
            collection.executor().reporter().success(&format!(
                "Snapshots for {} successfully cleaned",
                collection.name()
            ));
        }
        Ok(cleaned)
    })
    .await
}

/// Restores the newest snapshot of each collection. A collection without
/// snapshots counts as a failure.
pub async fn restore_snapshots(collections: &[Collection], priority: SnapshotPriority) -> RunSummary {
    run_list(collections, "Snapshot restoration", |collection| async move {
        let restored = collection
            .restore_snapshot(None, priority)
            .await?;
        if restored {
            collection.executor().reporter().success(&format!(
                "Latest snapshot for {} successfully restored",
                collection.name()
            ));
        }
        Ok(restored)
    })
    .await
}

pub async fn remove_snapshot(collection: &Collection, snapshot: &str) -> Result<bool, CollectionError> {
    let removed = collection.delete_snapshot(snapshot).await?;
    if removed {
        collection
            .executor()
            .reporter()
            .success(&format!("Snapshot {} successfully removed", snapshot));
    }
    Ok(removed)
}

pub async fn restore_named_snapshot(
    collection: &Collection,
    snapshot: &str,
    priority: SnapshotPriority,
) -> Result<bool, CollectionError> {
    let restored = collection.restore_snapshot(Some(snapshot), priority).await?;
    if restored {
        collection
            .executor()
            .reporter()
            .success(&format!("Snapshot {} successfully restored", snapshot));
    } else {
        collection
            .executor()
            .reporter()
            .warning(&format!("Snapshot {} restore failed", snapshot));
    }
    Ok(restored)
}
