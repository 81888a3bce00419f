// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cursor-based scanning over a collection.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::core::collection::Collection;
use crate::core::CollectionError;
use crate::types::{Filter, Record, ScrollRequest, WithPayload};

/// Records fetched per scroll round-trip.
pub const SCROLL_PAGE_SIZE: usize = 1000;

impl Collection {
    /// Streams scroll pages until the store stops returning a cursor. Each
    /// page is requested exactly once; the stream cannot be restarted.
    pub fn scan_pages(
        &self,
        filter: Option<Filter>,
        fields: Option<Vec<String>>,
        include_vectors: bool,
    ) -> BoxStream<'_, Result<Vec<Record>, CollectionError>> {
        let first = ScrollRequest {
            filter,
            limit: SCROLL_PAGE_SIZE,
            offset: None,
            with_payload: WithPayload::from_fields(fields.as_deref()),
            with_vector: include_vectors,
        };

        stream::try_unfold(Some(first), move |next| async move {
            let Some(request) = next else {
                return Ok(None);
            };

            let page = {
                let request = &request;
                self.request("scroll", move |store, name| store.scroll(name, request))
                    .await?
            };

            let following = page.next_page_offset.map(|offset| ScrollRequest {
                offset: Some(offset),
                ..request
            });
            Ok(Some((page.points, following)))
        })
        .boxed()
    }

    /// Every record matching `filter`, accumulated across all pages.
    pub async fn scan(
        &self,
        filter: Option<Filter>,
        fields: Option<Vec<String>>,
        include_vectors: bool,
    ) -> Result<Vec<Record>, CollectionError> {
        self.scan_pages(filter, fields, include_vectors)
            .try_concat()
            .await
    }

    pub async fn check_exists(&self, filter: Option<Filter>) -> Result<bool, CollectionError> {
        let request = ScrollRequest {
            filter,
            limit: 1,
            offset: None,
            with_payload: WithPayload::Enable(false),
            with_vector: false,
        };
        let request = &request;

        let page = self
            .request("scroll", move |store, name| store.scroll(name, request))
            .await?;
        Ok(!page.points.is_empty())
    }

    pub async fn count_matching(&self, filter: Option<Filter>) -> Result<u64, CollectionError> {
        let filter = filter.as_ref();
        self.request("count", move |store, name| store.count(name, filter, true))
            .await
    }
}
