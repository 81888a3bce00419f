// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use tracing::debug;

use crate::core::collection::Collection;
use crate::core::CollectionError;
use crate::types::{Snapshot, SnapshotPriority};

pub const DEFAULT_SNAPSHOT_KEEP: usize = 3;

impl Collection {
    pub async fn create_snapshot(&self) -> Result<Snapshot, CollectionError> {
        let snapshot = self
            .request("create_snapshot", |store, name| store.create_snapshot(name))
            .await?;

        self.executor().reporter().success(&format!(
            "Snapshot {} for {} successfully created",
            snapshot.name,
            self.name()
        ));
        Ok(snapshot)
    }

    /// Snapshots ordered newest first. Snapshots without a creation time sort last.
    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>, CollectionError> {
        let mut snapshots = self
            .request("list_snapshots", |store, name| store.list_snapshots(name))
            .await?;
        snapshots.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
        Ok(snapshots)
    }

    /// Returns `false`, with a warning, when nothing was removed.
    pub async fn delete_snapshot(&self, snapshot: &str) -> Result<bool, CollectionError> {
        let deleted = match self
            .request("delete_snapshot", move |store, name| {
                store.delete_snapshot(name, snapshot)
            })
            .await
        {
            Ok(deleted) => deleted,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };

        if !deleted {
            self.executor().reporter().warning(&format!(
                "Snapshot {} of {} not removed",
                snapshot,
                self.name()
            ));
        }
        Ok(deleted)
    }

    /// Keeps the `keep` newest snapshots and deletes the rest.
    /// A failed deletion does not stop the others; the result is `true` only
    /// if every deletion succeeded.
    pub async fn clean_snapshots(&self, keep: usize) -> Result<bool, CollectionError> {
        let mut success = true;

        for snapshot in self.list_snapshots().await?.iter().skip(keep) {
            self.executor()
                .reporter()
                .notice(&format!("Removing snapshot: {}", snapshot.name));

            match self.delete_snapshot(&snapshot.name).await {
                Ok(true) => {}
                Ok(false) => success = false,
                Err(e) => {
                    self.executor().reporter().warning(&format!(
                        "Removing snapshot {} failed with: {}",
                        snapshot.name, e
                    ));
                    success = false;
                }
            }
        }
        Ok(success)
    }

    /// Restores `snapshot`, or the newest one when `None`. Returns `false`
    /// when there is nothing to restore.
    pub async fn restore_snapshot(
        &self,
        snapshot: Option<&str>,
        priority: SnapshotPriority,
    ) -> Result<bool, CollectionError> {
        let snapshot = match snapshot {
            Some(snapshot) => snapshot.to_string(),
            None => match self.list_snapshots().await?.into_iter().next() {
                Some(latest) => latest.name,
                None => {
                    debug!(collection = %self.name(), "No snapshots to restore");
                    return Ok(false);
                }
            },
        };

        let location = self.config().snapshot_location(self.name(), &snapshot);
        let location = location.as_str();
        self.request("recover_snapshot", move |store, name| {
            store.recover_snapshot(name, location, priority)
        })
        .await
    }
}
