// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use qdrant_collection::client::{StoreError, StoreFactory, VectorStore};
use qdrant_collection::config::StoreConfig;
use qdrant_collection::core::{BackoffPolicy, ClientRegistry, Reporter};
use qdrant_collection::types::{
    CollectionDescription, Condition, CreateCollection, FieldInfo, Filter, Match, Payload,
    PayloadSchemaType, PointId, PointsSelector, Record, ScoredPoint, ScrollPage, ScrollRequest,
    SearchRequest, Snapshot, SnapshotPriority, WithPayload,
};

pub const DIMENSION: usize = 3;

pub fn test_config() -> StoreConfig {
    StoreConfig {
        default_dimension: DIMENSION,
        backoff: BackoffPolicy {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(4),
            max_attempts: None,
        },
        ..Default::default()
    }
}

pub struct MockCollection {
    pub params: CreateCollection,
    pub indexes: Vec<(String, PayloadSchemaType)>,
    pub points: Vec<Record>,
}

#[derive(Default)]
pub struct MockState {
    pub collections: HashMap<String, MockCollection>,
    pub calls: Vec<String>,
    pub scroll_offsets: Vec<Option<PointId>>,
    pub search_batches: Vec<usize>,
    pub transient_failures: HashMap<String, u32>,
    pub api_failures: HashSet<String>,
    pub snapshots: HashMap<String, Vec<Snapshot>>,
    pub failing_snapshot_deletes: HashSet<String>,
    pub deleted_snapshots: Vec<String>,
    pub recovered: Vec<(String, String, SnapshotPriority)>,
    pub snapshot_counter: u32,
    /// Simulates another process winning the create race: `create_collection`
    /// inserts the collection, answers 409, and the next existence check
    /// drops once.
    pub lose_create_race: bool,
}

/// In-memory store recording every call.
#[derive(Default)]
pub struct MockVectorStore {
    pub state: Mutex<MockState>,
}

impl MockVectorStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next `times` calls of `operation` fail with a transport error.
    pub fn fail_next(&self, operation: &str, times: u32) {
        let mut state = self.state.lock().unwrap();
        state.transient_failures.insert(operation.to_string(), times);
    }

    /// Every call of `operation` is rejected by the store.
    pub fn reject(&self, operation: &str) {
        self.state
            .lock()
            .unwrap()
            .api_failures
            .insert(operation.to_string());
    }

    pub fn add_collection(&self, name: &str, dimension: usize, points: Vec<Record>) {
        let mut state = self.state.lock().unwrap();
        state.collections.insert(
            name.to_string(),
            MockCollection {
                params: CreateCollection {
                    vectors: qdrant_collection::types::VectorParams {
                        size: dimension,
                        distance: qdrant_collection::types::Distance::Cosine,
                    },
                    shard_number: 1,
                },
                indexes: Vec::new(),
                points,
            },
        );
    }

    pub fn add_snapshot(&self, collection: &str, name: &str, creation_time: &str) {
        let time = NaiveDateTime::parse_from_str(creation_time, "%Y-%m-%dT%H:%M:%S").unwrap();
        self.state
            .lock()
            .unwrap()
            .snapshots
            .entry(collection.to_string())
            .or_default()
            .push(Snapshot {
                name: name.to_string(),
                creation_time: Some(time),
                size: 1024,
            });
    }

    pub fn fail_snapshot_delete(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_snapshot_deletes
            .insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| *c == operation).count()
    }

    pub fn points(&self, collection: &str) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|c| c.points.clone())
            .unwrap_or_default()
    }

    pub fn snapshot_names(&self, collection: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .snapshots
            .get(collection)
            .map(|s| s.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    fn enter(&self, operation: &str) -> Result<std::sync::MutexGuard<'_, MockState>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());

        if let Some(remaining) = state.transient_failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Transport(format!("{} connection reset", operation)));
            }
        }
        if state.api_failures.contains(operation) {
            return Err(StoreError::Api {
                status: 400,
                message: format!("{} rejected", operation),
            });
        }
        Ok(state)
    }
}

fn missing(collection: &str) -> StoreError {
    StoreError::NotFound(format!("Collection {} not found", collection))
}

pub fn matches_filter(filter: Option<&Filter>, payload: &Payload) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.must.iter().all(|condition| match condition {
        Condition::Field(field) => {
            let value = payload.get(&field.key);
            match &field.matches {
                Match::Any { any } => value.map_or(false, |v| any.contains(v)),
                Match::Value { value: expected } => value == Some(expected),
            }
        }
        Condition::Nested(nested) => matches_filter(Some(nested), payload),
    })
}

fn project(record: &Record, with_payload: &WithPayload, with_vector: bool) -> Record {
    let payload = match with_payload {
        WithPayload::Enable(true) => record.payload.clone(),
        WithPayload::Enable(false) => Payload::new(),
        WithPayload::Include(fields) => record
            .payload
            .iter()
            .filter(|(key, _)| fields.contains(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };
    Record {
        id: record.id.clone(),
        vector: if with_vector { record.vector.clone() } else { None },
        payload,
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        let state = self.enter("collection_exists")?;
        Ok(state.collections.contains_key(collection))
    }

    async fn create_collection(
        &self,
        collection: &str,
        params: &CreateCollection,
    ) -> Result<(), StoreError> {
        let mut state = self.enter("create_collection")?;
        if state.lose_create_race {
            state.lose_create_race = false;
            state.collections.insert(
                collection.to_string(),
                MockCollection {
                    params: params.clone(),
                    indexes: Vec::new(),
                    points: Vec::new(),
                },
            );
            state
                .transient_failures
                .insert("collection_exists".to_string(), 1);
        }
        if state.collections.contains_key(collection) {
            return Err(StoreError::Api {
                status: 409,
                message: format!("Collection {} already exists", collection),
            });
        }
        state.collections.insert(
            collection.to_string(),
            MockCollection {
                params: params.clone(),
                indexes: Vec::new(),
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field_name: &str,
        schema: PayloadSchemaType,
    ) -> Result<(), StoreError> {
        let mut state = self.enter("create_payload_index")?;
        let entry = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        entry.indexes.retain(|(field, _)| field != field_name);
        entry.indexes.push((field_name.to_string(), schema));
        Ok(())
    }

    async fn get_collection(&self, collection: &str) -> Result<CollectionDescription, StoreError> {
        let state = self.enter("get_collection")?;
        let entry = state
            .collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;

        let payload_schema = entry
            .indexes
            .iter()
            .map(|(field, schema)| {
                let points = entry
                    .points
                    .iter()
                    .filter(|p| p.payload.contains_key(field))
                    .count() as u64;
                let data_type = serde_json::to_value(schema)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                (field.clone(), FieldInfo { data_type, points })
            })
            .collect();

        Ok(CollectionDescription {
            status: "green".to_string(),
            optimizer_status: Value::String("ok".to_string()),
            vectors_count: Some(entry.points.len() as u64),
            indexed_vectors_count: Some(0),
            points_count: Some(entry.points.len() as u64),
            segments_count: 2,
            payload_schema,
        })
    }

    async fn upsert(&self, collection: &str, points: &[Record]) -> Result<(), StoreError> {
        let mut state = self.enter("upsert")?;
        let entry = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        for point in points {
            match entry.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point.clone(),
                None => entry.points.push(point.clone()),
            }
        }
        Ok(())
    }

    async fn delete_points(
        &self,
        collection: &str,
        selector: &PointsSelector,
    ) -> Result<(), StoreError> {
        let mut state = self.enter("delete_points")?;
        let entry = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        match selector {
            PointsSelector::Ids { points } => entry.points.retain(|p| !points.contains(&p.id)),
            PointsSelector::Filter { filter } => entry
                .points
                .retain(|p| !matches_filter(Some(filter), &p.payload)),
        }
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        request: &ScrollRequest,
    ) -> Result<ScrollPage, StoreError> {
        let mut state = self.enter("scroll")?;
        state.scroll_offsets.push(request.offset.clone());
        let entry = state
            .collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;

        let matching: Vec<&Record> = entry
            .points
            .iter()
            .filter(|p| matches_filter(request.filter.as_ref(), &p.payload))
            .collect();

        let start = match &request.offset {
            Some(PointId::Num(n)) => *n as usize,
            Some(other) => panic!("unexpected cursor {:?}", other),
            None => 0,
        };
        let end = (start + request.limit).min(matching.len());
        let points = matching[start.min(end)..end]
            .iter()
            .map(|p| project(p, &request.with_payload, request.with_vector))
            .collect();
        let next_page_offset = if end < matching.len() {
            Some(PointId::Num(end as u64))
        } else {
            None
        };

        Ok(ScrollPage {
            points,
            next_page_offset,
        })
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        _exact: bool,
    ) -> Result<u64, StoreError> {
        let state = self.enter("count")?;
        let entry = state
            .collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;
        Ok(entry
            .points
            .iter()
            .filter(|p| matches_filter(filter, &p.payload))
            .count() as u64)
    }

    async fn search_batch(
        &self,
        collection: &str,
        requests: &[SearchRequest],
    ) -> Result<Vec<Vec<ScoredPoint>>, StoreError> {
        let mut state = self.enter("search_batch")?;
        state.search_batches.push(requests.len());
        let entry = state
            .collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;

        Ok(requests
            .iter()
            .map(|request| {
                let mut hits: Vec<ScoredPoint> = entry
                    .points
                    .iter()
                    .filter(|p| matches_filter(request.filter.as_ref(), &p.payload))
                    .map(|p| {
                        let projected = project(p, &request.with_payload, request.with_vector);
                        ScoredPoint {
                            id: p.id.clone(),
                            version: 0,
                            score: cosine(&request.vector, p.vector.as_deref().unwrap_or(&[])),
                            payload: Some(projected.payload),
                            vector: projected.vector,
                        }
                    })
                    .filter(|hit| request.score_threshold.map_or(true, |t| hit.score >= t))
                    .collect();
                hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
                hits.truncate(request.limit);
                hits
            })
            .collect())
    }

    async fn create_snapshot(&self, collection: &str) -> Result<Snapshot, StoreError> {
        let mut state = self.enter("create_snapshot")?;
        if !state.collections.contains_key(collection) {
            return Err(missing(collection));
        }
        state.snapshot_counter += 1;
        let counter = state.snapshot_counter;
        let snapshot = Snapshot {
            name: format!("{}-{}.snapshot", collection, counter),
            creation_time: NaiveDateTime::parse_from_str("2025-01-01T00:00:00", "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|t| t + chrono::Duration::seconds(counter as i64)),
            size: 2048,
        };
        state
            .snapshots
            .entry(collection.to_string())
            .or_default()
            .push(snapshot.clone());
        Ok(snapshot)
    }

    async fn list_snapshots(&self, collection: &str) -> Result<Vec<Snapshot>, StoreError> {
        let state = self.enter("list_snapshots")?;
        Ok(state.snapshots.get(collection).cloned().unwrap_or_default())
    }

    async fn delete_snapshot(&self, collection: &str, snapshot: &str) -> Result<bool, StoreError> {
        let mut state = self.enter("delete_snapshot")?;
        if state.failing_snapshot_deletes.contains(snapshot) {
            return Err(StoreError::Api {
                status: 500,
                message: format!("cannot delete {}", snapshot),
            });
        }
        state.deleted_snapshots.push(snapshot.to_string());
        let snapshots = state.snapshots.entry(collection.to_string()).or_default();
        let before = snapshots.len();
        snapshots.retain(|s| s.name != snapshot);
        Ok(snapshots.len() < before)
    }

    async fn recover_snapshot(
        &self,
        collection: &str,
        location: &str,
        priority: SnapshotPriority,
    ) -> Result<bool, StoreError> {
        let mut state = self.enter("recover_snapshot")?;
        state
            .recovered
            .push((collection.to_string(), location.to_string(), priority));
        Ok(true)
    }
}

/// Hands out the same mock store, counting connections.
pub struct MockFactory {
    pub store: Arc<MockVectorStore>,
    pub connects: AtomicUsize,
    pub fail: bool,
}

impl MockFactory {
    pub fn new(store: Arc<MockVectorStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            connects: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            store: MockVectorStore::new(),
            connects: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl StoreFactory for MockFactory {
    fn connect(&self, _config: &StoreConfig) -> Result<Arc<dyn VectorStore>, StoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        Ok(self.store.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Level {
    Success,
    Notice,
    Warning,
}

#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<(Level, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn success(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((Level::Success, message.to_string()));
    }

    fn notice(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((Level::Notice, message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((Level::Warning, message.to_string()));
    }
}

pub struct Harness {
    pub store: Arc<MockVectorStore>,
    pub factory: Arc<MockFactory>,
    pub reporter: Arc<RecordingReporter>,
    pub registry: ClientRegistry,
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: StoreConfig) -> Harness {
    let store = MockVectorStore::new();
    let factory = MockFactory::new(store.clone());
    let reporter = RecordingReporter::new();
    let registry = ClientRegistry::with_factory(config, factory.clone())
        .with_reporter(reporter.clone());

    Harness {
        store,
        factory,
        reporter,
        registry,
    }
}

pub fn point(id: u64, vector: Vec<f32>, payload: Value) -> Record {
    Record {
        id: PointId::Num(id),
        vector: Some(vector),
        payload: payload.as_object().cloned().unwrap_or_default(),
    }
}
