// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod http;
pub mod store;

pub use http::QdrantHttpClient;
pub use store::{HttpStoreFactory, StoreError, StoreFactory, VectorStore};
