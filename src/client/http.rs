// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::store::{StoreError, VectorStore};
use crate::config::StoreConfig;
use crate::types::{
    CollectionDescription, CreateCollection, Filter, PayloadIndex, PayloadSchemaType,
    PointsSelector, Record, ScoredPoint, ScrollPage, ScrollRequest, SearchRequest, Snapshot,
    SnapshotPriority,
};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    points: &'a [Record],
}

#[derive(Debug, Serialize)]
struct CountBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Filter>,
    exact: bool,
}

#[derive(Debug, Serialize)]
struct SearchBatchBody<'a> {
    searches: &'a [SearchRequest],
}

#[derive(Debug, Serialize)]
struct RecoverBody<'a> {
    location: &'a str,
    priority: SnapshotPriority,
}

/// REST client for the vector store.
#[derive(Clone)]
pub struct QdrantHttpClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl std::fmt::Debug for QdrantHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantHttpClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}

impl QdrantHttpClient {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::with_base_url(config.base_url(), config)
    }

    /// Points the client at an explicit base URL, keeping the other settings.
    pub fn with_base_url(base_url: impl Into<String>, config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Vector store request");

        let mut request = self.client.request(method, url);
        if let Some(api_key) = &self.api_key {
            request = request.header("api-key", api_key);
        }
        request
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(error_message(&body)));
        }
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(envelope.result)
    }
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value["status"]["error"]
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[async_trait]
impl VectorStore for QdrantHttpClient {
    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        let path = format!("/collections/{}/exists", collection);
        let result: ExistsResult = self.send(self.request(Method::GET, &path)).await?;
        Ok(result.exists)
    }

    async fn create_collection(
        &self,
        collection: &str,
        params: &CreateCollection,
    ) -> Result<(), StoreError> {
        let path = format!("/collections/{}", collection);
        let _: serde_json::Value = self
            .send(self.request(Method::PUT, &path).json(params))
            .await?;
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field_name: &str,
        schema: PayloadSchemaType,
    ) -> Result<(), StoreError> {
        let path = format!("/collections/{}/index?wait=true", collection);
        let body = PayloadIndex::new(field_name, schema);
        let _: serde_json::Value = self
            .send(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn get_collection(&self, collection: &str) -> Result<CollectionDescription, StoreError> {
        let path = format!("/collections/{}", collection);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn upsert(&self, collection: &str, points: &[Record]) -> Result<(), StoreError> {
        let path = format!("/collections/{}/points?wait=true", collection);
        let _: serde_json::Value = self
            .send(self.request(Method::PUT, &path).json(&UpsertBody { points }))
            .await?;
        Ok(())
    }

    async fn delete_points(
        &self,
        collection: &str,
        selector: &PointsSelector,
    ) -> Result<(), StoreError> {
        let path = format!("/collections/{}/points/delete?wait=true", collection);
        let _: serde_json::Value = self
            .send(self.request(Method::POST, &path).json(selector))
            .await?;
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        request: &ScrollRequest,
    ) -> Result<ScrollPage, StoreError> {
        let path = format!("/collections/{}/points/scroll", collection);
        self.send(self.request(Method::POST, &path).json(request)).await
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        exact: bool,
    ) -> Result<u64, StoreError> {
        let path = format!("/collections/{}/points/count", collection);
        let result: CountResult = self
            .send(self.request(Method::POST, &path).json(&CountBody { filter, exact }))
            .await?;
        Ok(result.count)
    }

    async fn search_batch(
        &self,
        collection: &str,
        requests: &[SearchRequest],
    ) -> Result<Vec<Vec<ScoredPoint>>, StoreError> {
        let path = format!("/collections/{}/points/search/batch", collection);
        self.send(
            self.request(Method::POST, &path)
                .json(&SearchBatchBody { searches: requests }),
        )
        .await
    }

    async fn create_snapshot(&self, collection: &str) -> Result<Snapshot, StoreError> {
        let path = format!("/collections/{}/snapshots?wait=true", collection);
        self.send(self.request(Method::POST, &path)).await
    }

    async fn list_snapshots(&self, collection: &str) -> Result<Vec<Snapshot>, StoreError> {
        let path = format!("/collections/{}/snapshots", collection);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn delete_snapshot(&self, collection: &str, snapshot: &str) -> Result<bool, StoreError> {
        let path = format!("/collections/{}/snapshots/{}?wait=true", collection, snapshot);
        match self.send(self.request(Method::DELETE, &path)).await {
            Ok(deleted) => Ok(deleted),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn recover_snapshot(
        &self,
        collection: &str,
        location: &str,
        priority: SnapshotPriority,
    ) -> Result<bool, StoreError> {
        let path = format!("/collections/{}/snapshots/recover?wait=true", collection);
        self.send(
            self.request(Method::PUT, &path)
                .json(&RecoverBody { location, priority }),
        )
        .await
    }
}
