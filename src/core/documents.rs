// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence collection keyed by document.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::codec::{make_id_filter, make_record};
use crate::core::collection::{Collection, CollectionSpec};
use crate::core::provider::{CollectionProvider, RecordQuery};
use crate::core::registry::ClientRegistry;
use crate::core::search::SearchOptions;
use crate::core::CollectionError;
use crate::types::{Filter, Payload, PayloadIndex, PayloadSchemaType, Record, ScoredPoint};

pub const DOCUMENT_ID_FIELD: &str = "document_id";
pub const POSITION_FIELD: &str = "position";
pub const SENTENCE_FIELD: &str = "sentence";

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSentence {
    pub document_id: String,
    /// Position of the sentence within its document.
    pub position: u64,
    pub sentence: String,
    pub embedding: Vec<f32>,
}

/// Parallel sentence and vector lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentenceEmbeddings {
    pub sentences: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct DocumentCollection {
    collection: Collection,
}

impl DocumentCollection {
    pub async fn open(registry: &ClientRegistry, name: &str) -> Result<Self, CollectionError> {
        Self::open_with(registry, CollectionSpec::new(name)).await
    }

    pub async fn open_with(
        registry: &ClientRegistry,
        spec: CollectionSpec,
    ) -> Result<Self, CollectionError> {
        let spec = spec.index_fields(Self::index_fields());
        Ok(Self {
            collection: Collection::open(registry, spec).await?,
        })
    }

    fn id_filter(ids: &[Value]) -> Option<Filter> {
        if ids.is_empty() {
            None
        } else {
            Some(make_id_filter(DOCUMENT_ID_FIELD, ids))
        }
    }

    /// Sentences and vectors of the given documents, or of the whole
    /// collection when `document_ids` is empty.
    pub async fn embeddings(&self, document_ids: &[Value]) -> Result<SentenceEmbeddings, CollectionError> {
        let mut query = RecordQuery::new()
            .fields([SENTENCE_FIELD])
            .include_vectors(true);
        if !document_ids.is_empty() {
            query = query.matching(DOCUMENT_ID_FIELD, document_ids.to_vec());
        }

        let mut result = SentenceEmbeddings::default();
        for record in self.get(query).await? {
            if let (Some(sentence), Some(vector)) = (record.sentence(), record.vector.as_ref()) {
                result.sentences.push(sentence.to_string());
                result.embeddings.push(vector.clone());
            }
        }
        Ok(result)
    }

    /// Search that always returns the sentence, plus the filter field when
    /// one is set.
    pub async fn search_sentences(
        &self,
        embeddings: &[Vec<f32>],
        options: SearchOptions,
    ) -> Result<Vec<Vec<ScoredPoint>>, CollectionError> {
        if embeddings.is_empty() {
            return Ok(Vec::new());
        }

        let mut fields = Vec::new();
        if let Some(field) = &options.filter_field {
            fields.push(field.clone());
        }
        fields.extend(options.fields.clone().unwrap_or_default());
        fields.push(SENTENCE_FIELD.to_string());

        let options = SearchOptions {
            fields: Some(fields),
            ..options
        };
        self.collection.search(embeddings, &options).await
    }
}

#[async_trait]
impl CollectionProvider for DocumentCollection {
    type Entry = DocumentSentence;

    fn index_fields() -> Vec<PayloadIndex> {
        vec![
            PayloadIndex::new(DOCUMENT_ID_FIELD, PayloadSchemaType::Keyword),
            PayloadIndex::new(POSITION_FIELD, PayloadSchemaType::Integer),
        ]
    }

    fn collection(&self) -> &Collection {
        &self.collection
    }

    async fn count(&self, ids: &[Value]) -> Result<u64, CollectionError> {
        self.collection.count_matching(Self::id_filter(ids)).await
    }

    async fn exists(&self, ids: &[Value]) -> Result<bool, CollectionError> {
        self.collection.check_exists(Self::id_filter(ids)).await
    }

    async fn get(&self, query: RecordQuery) -> Result<Vec<Record>, CollectionError> {
        self.collection
            .scan(query.to_filter(), query.fields, query.include_vectors)
            .await
    }

    async fn store(
        &self,
        entries: Vec<DocumentSentence>,
        partition: Option<usize>,
    ) -> Result<(), CollectionError> {
        let records: Vec<Record> = entries
            .into_iter()
            .map(|entry| {
                let mut fields = Payload::new();
                fields.insert(DOCUMENT_ID_FIELD.to_string(), json!(entry.document_id));
                fields.insert(POSITION_FIELD.to_string(), json!(entry.position));
                make_record(&entry.sentence, entry.embedding, fields)
            })
            .collect();

        self.collection.upsert(&records, partition).await
    }

    /// Removes every sentence of the given documents. An empty id list
    /// removes nothing.
    async fn remove(&self, ids: &[Value]) -> Result<(), CollectionError> {
        match Self::id_filter(ids) {
            Some(filter) => self.collection.remove_matching(filter).await,
            None => Ok(()),
        }
    }
}
