// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::core::codec::id_condition;
use crate::core::collection::Collection;
use crate::core::CollectionError;
use crate::types::{Filter, PayloadIndex, Record};

pub const DEFAULT_FILTER_BATCH: usize = 500;

/// Field matches plus projection for a `get`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub matches: Vec<(String, Vec<Value>)>,
    pub fields: Option<Vec<String>>,
    pub include_vectors: bool,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.matches.push((field.into(), values));
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

    /// `None` when the query has no conditions.
    pub fn to_filter(&self) -> Option<Filter> {
        let conditions: Vec<_> = self
            .matches
            .iter()
            .map(|(field, values)| id_condition(field, values))
            .collect();
        if conditions.is_empty() {
            None
        } else {
            Some(Filter::must(conditions))
        }
    }
}

/// A concrete collection schema built on [`Collection`].
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// What `store` accepts.
    type Entry: Send + 'static;

    /// Payload indexes created together with the collection.
    fn index_fields() -> Vec<PayloadIndex>
    where
        Self: Sized;

    fn collection(&self) -> &Collection;

    async fn count(&self, ids: &[Value]) -> Result<u64, CollectionError>;

    async fn exists(&self, ids: &[Value]) -> Result<bool, CollectionError>;

    async fn get(&self, query: RecordQuery) -> Result<Vec<Record>, CollectionError>;

    async fn store(
        &self,
        entries: Vec<Self::Entry>,
        partition: Option<usize>,
    ) -> Result<(), CollectionError>;

    async fn remove(&self, ids: &[Value]) -> Result<(), CollectionError>;

    /// Lazily fetches records whose `id_field` is in `ids`, `batch_size` ids
    /// per `get`. Only `id_field` is returned unless `fields` says otherwise.
    fn filter<'a>(
        &'a self,
        id_field: &str,
        ids: Vec<Value>,
        fields: Option<Vec<String>>,
        include_vectors: bool,
        batch_size: usize,
    ) -> BoxStream<'a, Result<Record, CollectionError>> {
        let id_field = id_field.to_string();
        let fields = fields.unwrap_or_else(|| vec![id_field.clone()]);
        let groups: Vec<Vec<Value>> = ids
            .chunks(batch_size.max(1))
            .map(<[Value]>::to_vec)
            .collect();

        stream::iter(groups)
            .then(move |group| {
                let query = RecordQuery::new()
                    .matching(id_field.clone(), group)
                    .fields(fields.clone())
                    .include_vectors(include_vectors);
                self.get(query)
            })
            .map_ok(|records| stream::iter(records.into_iter().map(Ok::<Record, CollectionError>)))
            .try_flatten()
            .boxed()
    }
}
