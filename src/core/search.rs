// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Batched similarity search.

use serde_json::Value;
use tracing::debug;

use crate::core::codec::make_id_filter;
use crate::core::collection::Collection;
use crate::core::CollectionError;
use crate::types::{ScoredPoint, SearchRequest, WithPayload};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_BATCH: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    /// Payload fields to return. `None` returns the whole payload, unlike
    /// the store's own search default of no payload.
    pub fields: Option<Vec<String>>,
    pub include_vectors: bool,
    pub filter_field: Option<String>,
    pub filter_values: Vec<Value>,
    /// Queries sent per remote call.
    pub batch_size: usize,
    pub min_score: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            fields: None,
            include_vectors: false,
            filter_field: None,
            filter_values: Vec::new(),
            batch_size: DEFAULT_SEARCH_BATCH,
            min_score: 0.0,
        }
    }
}

impl SearchOptions {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn include_vectors(mut self, include: bool) -> Self {
        self.include_vectors = include;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter_field = Some(field.into());
        self.filter_values = values;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

impl Collection {
    /// Searches for every embedding, `batch_size` queries per remote call.
    /// Result `i` belongs to embedding `i`.
    pub async fn search(
        &self,
        embeddings: &[Vec<f32>],
        options: &SearchOptions,
    ) -> Result<Vec<Vec<ScoredPoint>>, CollectionError> {
        if embeddings.is_empty() {
            return Ok(Vec::new());
        }
        for embedding in embeddings {
            self.check_dimension(embedding)?;
        }

        let filter = match &options.filter_field {
            Some(field) if !options.filter_values.is_empty() => {
                Some(make_id_filter(field, &options.filter_values))
            }
            _ => None,
        };
        let with_payload = WithPayload::from_fields(options.fields.as_deref());

        let mut results = Vec::with_capacity(embeddings.len());
        for batch in embeddings.chunks(options.batch_size.max(1)) {
            let requests: Vec<SearchRequest> = batch
                .iter()
                .map(|embedding| SearchRequest {
                    vector: embedding.clone(),
                    filter: filter.clone(),
                    limit: options.limit,
                    with_payload: with_payload.clone(),
                    with_vector: options.include_vectors,
                    score_threshold: Some(options.min_score),
                })
                .collect();
            let requests = requests.as_slice();

            debug!(collection = %self.name(), queries = requests.len(), "Searching batch");
            let batch_results = self
                .request("search_batch", move |store, name| {
                    store.search_batch(name, requests)
                })
                .await?;
            results.extend(batch_results);
        }
        Ok(results)
    }
}
