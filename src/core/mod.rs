// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod backoff;
pub mod codec;
pub mod collection;
pub mod documents;
pub mod provider;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod search;
pub mod snapshot;

use thiserror::Error;

use crate::client::StoreError;
use crate::config::ConfigError;

pub use backoff::{BackoffPolicy, RequestExecutor};
pub use codec::{make_id_filter, make_record, point_id};
pub use collection::{Collection, CollectionSpec};
pub use documents::{DocumentCollection, DocumentSentence, SentenceEmbeddings};
pub use provider::{CollectionProvider, RecordQuery};
pub use registry::{collection_identity, ClientRegistry};
pub use report::{Reporter, TracingReporter};
pub use search::SearchOptions;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to initialize collection {collection}: {source}")]
    Initialization {
        collection: String,
        source: Box<CollectionError>,
    },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Request for {operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        source: StoreError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CollectionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectionError::Store(StoreError::NotFound(_)))
    }
}
