// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide registry of store clients keyed by collection identity.
//!
//! A single lock serializes client construction, collection creation and
//! payload index setup, so concurrent openers of the same collection never
//! race to create it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::{HttpStoreFactory, StoreError, StoreFactory, VectorStore};
use crate::config::StoreConfig;
use crate::core::backoff::RequestExecutor;
use crate::core::collection::CollectionSpec;
use crate::core::report::{Reporter, TracingReporter};
use crate::core::CollectionError;
use crate::types::{CreateCollection, Distance, VectorParams};

pub fn collection_identity(name: &str) -> String {
    hex::encode(blake3::hash(name.as_bytes()).as_bytes())
}

#[derive(Default)]
struct RegistryState {
    clients: HashMap<String, Arc<dyn VectorStore>>,
    initialized: HashSet<String>,
    /// Payload index fields already ensured per identity.
    indexed: HashMap<String, HashSet<String>>,
}

pub struct ClientRegistry {
    config: StoreConfig,
    factory: Arc<dyn StoreFactory>,
    reporter: Arc<dyn Reporter>,
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("config", &self.config)
            .finish()
    }
}

impl ClientRegistry {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_factory(config, Arc::new(HttpStoreFactory))
    }

    pub fn with_factory(config: StoreConfig, factory: Arc<dyn StoreFactory>) -> Self {
        Self {
            config,
            factory,
            reporter: Arc::new(TracingReporter),
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn reporter(&self) -> Arc<dyn Reporter> {
        self.reporter.clone()
    }

    pub fn executor(&self) -> RequestExecutor {
        RequestExecutor::new(self.config.backoff.clone(), self.reporter.clone())
    }

    fn client_for(
        &self,
        state: &mut RegistryState,
        name: &str,
        identity: &str,
    ) -> Result<Arc<dyn VectorStore>, CollectionError> {
        if let Some(client) = state.clients.get(identity) {
            return Ok(client.clone());
        }

        let client = self
            .factory
            .connect(&self.config)
            .map_err(|e| CollectionError::Initialization {
                collection: name.to_string(),
                source: Box::new(e.into()),
            })?;
        debug!(collection = name, identity, "Store client constructed");
        state.clients.insert(identity.to_string(), client.clone());
        Ok(client)
    }

    /// Returns the client for `spec`, creating the collection the first time
    /// the identity is seen. Every payload index `spec` declares is ensured,
    /// including on collections that already existed. An existing collection
    /// is never recreated.
    pub async fn ensure_initialized(
        &self,
        spec: &CollectionSpec,
    ) -> Result<Arc<dyn VectorStore>, CollectionError> {
        let identity = spec.identity();
        let mut state = self.state.lock().await;
        let client = self.client_for(&mut state, &spec.name, &identity)?;

        let initialization_error = |e: CollectionError| CollectionError::Initialization {
            collection: spec.name.clone(),
            source: Box::new(e),
        };

        if !state.initialized.contains(&identity) {
            self.create_if_absent(client.as_ref(), spec)
                .await
                .map_err(initialization_error)?;
            state.initialized.insert(identity.clone());
        }

        let indexed = state.indexed.entry(identity).or_default();
        self.ensure_indexes(client.as_ref(), spec, indexed)
            .await
            .map_err(initialization_error)?;
        Ok(client)
    }

    /// Returns the client for an existing collection without creating
    /// anything. Fails with `NotFound` when the collection is absent.
    pub async fn attach(&self, name: &str) -> Result<Arc<dyn VectorStore>, CollectionError> {
        let identity = collection_identity(name);
        let mut state = self.state.lock().await;
        let client = self.client_for(&mut state, name, &identity)?;

        let store = client.as_ref();
        let exists = self
            .executor()
            .execute("collection_exists", move || store.collection_exists(name))
            .await?;
        if !exists {
            return Err(StoreError::NotFound(format!("Collection {} not found", name)).into());
        }
        Ok(client)
    }

    async fn create_if_absent(
        &self,
        store: &dyn VectorStore,
        spec: &CollectionSpec,
    ) -> Result<(), CollectionError> {
        let executor = self.executor();
        let name = spec.name.as_str();

        if executor
            .execute("collection_exists", move || store.collection_exists(name))
            .await?
        {
            return Ok(());
        }

        let params = CreateCollection {
            vectors: VectorParams {
                size: spec.dimension.unwrap_or(self.config.default_dimension),
                distance: Distance::Cosine,
            },
            shard_number: spec.shards,
        };
        let params = &params;

        if let Err(e) = executor
            .execute("create_collection", move || store.create_collection(name, params))
            .await
        {
            // Another process may have created it between the check and here.
            let exists = executor
                .execute("collection_exists", move || store.collection_exists(name))
                .await?;
            if !exists {
                return Err(e);
            }
            debug!(collection = name, "Collection created concurrently");
        } else {
            info!(
                collection = name,
                dimension = params.vectors.size,
                shards = params.shard_number,
                "Collection created"
            );
        }
        Ok(())
    }

    async fn ensure_indexes(
        &self,
        store: &dyn VectorStore,
        spec: &CollectionSpec,
        indexed: &mut HashSet<String>,
    ) -> Result<(), CollectionError> {
        let executor = self.executor();
        let name = spec.name.as_str();

        for index in &spec.index_fields {
            if indexed.contains(&index.field_name) {
                continue;
            }
            let field = index.field_name.as_str();
            let schema = index.field_schema;
            executor
                .execute("create_payload_index", move || {
                    store.create_payload_index(name, field, schema)
                })
                .await?;
            debug!(collection = name, field, "Payload index ensured");
            indexed.insert(index.field_name.clone());
        }
        Ok(())
    }

    pub async fn is_initialized(&self, name: &str) -> bool {
        let state = self.state.lock().await;
        state.initialized.contains(&collection_identity(name))
    }

    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }

    /// Drops every cached client. Collections opened afterwards go through
    /// initialization again.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        let released = state.clients.len();
        state.clients.clear();
        state.initialized.clear();
        state.indexed.clear();
        debug!(released, "Client registry shut down");
    }
}
