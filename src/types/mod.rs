// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Wire and domain types shared by the store client and the collection layer.
//!
//! Shapes follow the vector store's REST contract so they can be serialized
//! directly into request bodies.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Insertion-ordered payload map.
pub type Payload = serde_json::Map<String, Value>;

/// Point identifier. The store accepts unsigned integers or UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Num(n)
    }
}

impl From<uuid::Uuid> for PointId {
    fn from(u: uuid::Uuid) -> Self {
        PointId::Uuid(u.to_string())
    }
}

/// One vector plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: PointId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub payload: Payload,
}

impl Record {
    pub fn sentence(&self) -> Option<&str> {
        self.payload.get("sentence").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    #[serde(default)]
    pub version: u64,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Payload>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Match {
    Any { any: Vec<Value> },
    Value { value: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: Match,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Field(FieldCondition),
    Nested(Filter),
}

/// Boolean filter over payload fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Condition>,
}

impl Filter {
    pub fn must(conditions: Vec<Condition>) -> Self {
        Self {
            must: conditions,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

/// Payload projection: everything, nothing, or the named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WithPayload {
    Enable(bool),
    Include(Vec<String>),
}

impl WithPayload {
    /// `None` selects the full payload.
    pub fn from_fields(fields: Option<&[String]>) -> Self {
        match fields {
            Some(fields) if !fields.is_empty() => WithPayload::Include(fields.to_vec()),
            _ => WithPayload::Enable(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    pub limit: usize,
    pub with_payload: WithPayload,
    pub with_vector: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<PointId>,
    pub with_payload: WithPayload,
    pub with_vector: bool,
}

/// One page of a scroll plus the cursor for the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPage {
    pub points: Vec<Record>,
    #[serde(default)]
    pub next_page_offset: Option<PointId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointsSelector {
    Ids { points: Vec<PointId> },
    Filter { filter: Filter },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCollection {
    pub vectors: VectorParams,
    pub shard_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSchemaType {
    Keyword,
    Integer,
    Float,
    Bool,
    Geo,
    Text,
    Datetime,
    Uuid,
}

/// A payload index to create alongside the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadIndex {
    pub field_name: String,
    pub field_schema: PayloadSchemaType,
}

impl PayloadIndex {
    pub fn new(field_name: impl Into<String>, field_schema: PayloadSchemaType) -> Self {
        Self {
            field_name: field_name.into(),
            field_schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub creation_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPriority {
    #[default]
    Snapshot,
    Replica,
    NoSync,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    #[serde(rename = "data_type")]
    pub data_type: String,
    #[serde(default)]
    pub points: u64,
}

/// Raw collection description as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub status: String,
    #[serde(default)]
    pub optimizer_status: Value,
    #[serde(default)]
    pub vectors_count: Option<u64>,
    #[serde(default)]
    pub indexed_vectors_count: Option<u64>,
    #[serde(default)]
    pub points_count: Option<u64>,
    #[serde(default)]
    pub segments_count: u64,
    #[serde(default)]
    pub payload_schema: BTreeMap<String, FieldInfo>,
}

/// Summary exposed to callers through `get_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub status: String,
    pub optimizer: Value,
    pub vector_count: Option<u64>,
    pub indexed_vector_count: Option<u64>,
    pub point_count: Option<u64>,
    pub segment_count: u64,
    pub schema: BTreeMap<String, FieldInfo>,
}

impl From<CollectionDescription> for CollectionInfo {
    fn from(description: CollectionDescription) -> Self {
        Self {
            status: description.status,
            optimizer: description.optimizer_status,
            vector_count: description.vectors_count,
            indexed_vector_count: description.indexed_vectors_count,
            point_count: description.points_count,
            segment_count: description.segments_count,
            schema: description.payload_schema,
        }
    }
}
