// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::types::{
    CollectionDescription, CreateCollection, Filter, PayloadSchemaType, PointsSelector, Record,
    ScoredPoint, ScrollPage, ScrollRequest, SearchRequest, Snapshot, SnapshotPriority,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Only connectivity failures are retried. Anything the store answered is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

/// Operations consumed from the remote vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError>;

    async fn create_collection(
        &self,
        collection: &str,
        params: &CreateCollection,
    ) -> Result<(), StoreError>;

    async fn create_payload_index(
        &self,
        collection: &str,
        field_name: &str,
        schema: PayloadSchemaType,
    ) -> Result<(), StoreError>;

    async fn get_collection(&self, collection: &str) -> Result<CollectionDescription, StoreError>;

    async fn upsert(&self, collection: &str, points: &[Record]) -> Result<(), StoreError>;

    async fn delete_points(
        &self,
        collection: &str,
        selector: &PointsSelector,
    ) -> Result<(), StoreError>;

    async fn scroll(&self, collection: &str, request: &ScrollRequest)
        -> Result<ScrollPage, StoreError>;

    async fn count(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        exact: bool,
    ) -> Result<u64, StoreError>;

    async fn search_batch(
        &self,
        collection: &str,
        requests: &[SearchRequest],
    ) -> Result<Vec<Vec<ScoredPoint>>, StoreError>;

    async fn create_snapshot(&self, collection: &str) -> Result<Snapshot, StoreError>;

    async fn list_snapshots(&self, collection: &str) -> Result<Vec<Snapshot>, StoreError>;

    /// Returns `false` when the store removed nothing.
    async fn delete_snapshot(&self, collection: &str, snapshot: &str) -> Result<bool, StoreError>;

    async fn recover_snapshot(
        &self,
        collection: &str,
        location: &str,
        priority: SnapshotPriority,
    ) -> Result<bool, StoreError>;
}

/// Builds store handles for the client registry.
pub trait StoreFactory: Send + Sync {
    fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn VectorStore>, StoreError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpStoreFactory;

impl StoreFactory for HttpStoreFactory {
    fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn VectorStore>, StoreError> {
        Ok(Arc::new(super::http::QdrantHttpClient::new(config)?))
    }
}
