// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Record assembly and deterministic point identifiers.

use serde_json::Value;
use uuid::Uuid;

use crate::types::{Condition, FieldCondition, Filter, Match, Payload, PointId, Record};

/// Identifier derived from the sentence and the extra field values, in
/// insertion order. Equal input always yields the same id, so re-storing a
/// record overwrites it.
pub fn point_id(sentence: &str, fields: &Payload) -> PointId {
    let mut hasher = blake3::Hasher::new();
    hash_component(&mut hasher, b's', sentence);
    for value in fields.values() {
        match value {
            Value::String(text) => hash_component(&mut hasher, b's', text),
            other => hash_component(&mut hasher, b'j', &other.to_string()),
        }
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    PointId::from(Uuid::from_bytes(bytes))
}

// Tag keeps "3" and 3 apart; length prefix keeps ["ab", "c"] and ["a", "bc"] apart.
fn hash_component(hasher: &mut blake3::Hasher, tag: u8, text: &str) {
    hasher.update(&[tag]);
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

pub fn make_record(sentence: &str, embedding: Vec<f32>, fields: Payload) -> Record {
    let id = point_id(sentence, &fields);

    let mut payload = Payload::new();
    payload.insert("sentence".to_string(), Value::String(sentence.to_string()));
    payload.extend(fields);

    Record {
        id,
        vector: Some(embedding),
        payload,
    }
}

/// "Any of" match on `field`.
pub fn id_condition(field: &str, ids: &[Value]) -> Condition {
    Condition::Field(FieldCondition {
        key: field.to_string(),
        matches: Match::Any { any: ids.to_vec() },
    })
}

pub fn make_id_filter(field: &str, ids: &[Value]) -> Filter {
    Filter::must(vec![id_condition(field, ids)])
}
