// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::client::{StoreError, VectorStore};
use crate::config::StoreConfig;
use crate::core::backoff::RequestExecutor;
use crate::core::registry::{collection_identity, ClientRegistry};
use crate::core::CollectionError;
use crate::types::{CollectionInfo, Filter, PayloadIndex, PointId, PointsSelector, Record};

/// How a collection should look when it has to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    /// Falls back to the configured default dimension.
    pub dimension: Option<usize>,
    pub shards: u32,
    pub index_fields: Vec<PayloadIndex>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: None,
            shards: 1,
            index_fields: Vec::new(),
        }
    }

    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn shards(mut self, shards: u32) -> Self {
        self.shards = shards.max(1);
        self
    }

    pub fn index_fields(mut self, index_fields: Vec<PayloadIndex>) -> Self {
        self.index_fields = index_fields;
        self
    }

    pub fn identity(&self) -> String {
        collection_identity(&self.name)
    }
}

/// Shared mechanics for one named collection: retried store access, upsert
/// and delete, scanning, batch search and snapshots.
#[derive(Clone)]
pub struct Collection {
    name: String,
    identity: String,
    dimension: usize,
    store: Arc<dyn VectorStore>,
    executor: RequestExecutor,
    config: StoreConfig,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl Collection {
    pub async fn open(registry: &ClientRegistry, spec: CollectionSpec) -> Result<Self, CollectionError> {
        let store = registry.ensure_initialized(&spec).await?;

        Ok(Self {
            identity: spec.identity(),
            dimension: spec.dimension.unwrap_or(registry.config().default_dimension),
            name: spec.name,
            store,
            executor: registry.executor(),
            config: registry.config().clone(),
        })
    }

    /// Opens an existing collection without creating it or its indexes.
    /// Vector checks use the configured default dimension.
    pub async fn attach(registry: &ClientRegistry, name: &str) -> Result<Self, CollectionError> {
        let store = registry.attach(name).await?;

        Ok(Self {
            name: name.to_string(),
            identity: collection_identity(name),
            dimension: registry.config().default_dimension,
            store,
            executor: registry.executor(),
            config: registry.config().clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Runs `f` against the store client under the retry policy.
    pub async fn request<'a, T, F, Fut>(&'a self, operation: &str, mut f: F) -> Result<T, CollectionError>
    where
        F: FnMut(&'a dyn VectorStore, &'a str) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let store = self.store.as_ref();
        let name = self.name.as_str();
        self.executor.execute(operation, || f(store, name)).await
    }

    pub(crate) fn check_dimension(&self, vector: &[f32]) -> Result<(), CollectionError> {
        if vector.len() != self.dimension {
            return Err(CollectionError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Upserts `records`, `partition` at a time when given. Every vector is
    /// checked against the collection dimension before anything is sent.
    pub async fn upsert(&self, records: &[Record], partition: Option<usize>) -> Result<(), CollectionError> {
        for record in records {
            match &record.vector {
                Some(vector) => self.check_dimension(vector)?,
                None => {
                    return Err(CollectionError::DimensionMismatch {
                        expected: self.dimension,
                        actual: 0,
                    })
                }
            }
        }
        if records.is_empty() {
            return Ok(());
        }

        let partition = partition.unwrap_or(records.len()).max(1);
        for chunk in records.chunks(partition) {
            debug!(collection = %self.name, points = chunk.len(), "Upserting points");
            self.request("upsert", move |store, name| store.upsert(name, chunk))
                .await?;
        }
        Ok(())
    }

    pub async fn remove_by_id(&self, id: PointId) -> Result<(), CollectionError> {
        let selector = PointsSelector::Ids { points: vec![id] };
        let selector = &selector;
        self.request("delete", move |store, name| store.delete_points(name, selector))
            .await
    }

    pub async fn remove_matching(&self, filter: Filter) -> Result<(), CollectionError> {
        let selector = PointsSelector::Filter { filter };
        let selector = &selector;
        self.request("delete", move |store, name| store.delete_points(name, selector))
            .await
    }

    pub async fn get_info(&self) -> Result<CollectionInfo, CollectionError> {
        let description = self
            .request("get_collection", |store, name| store.get_collection(name))
            .await?;
        Ok(description.into())
    }
}
