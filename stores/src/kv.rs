// Copyright (C) 2023 QuerentAI LLC.
// This file is part of Querent.

// The Licensed Work is licensed under the Business Source License 1.1 (BSL 1.1).
// You may use this file in compliance with the BSL 1.1, subject to the following restrictions:
// 1. You may not use the Licensed Work for AI-related services, database services,
//    or any service or product offering that provides database, big data, or analytics
//    services to third parties unless explicitly authorized by QuerentAI LLC.
// 2. For more details, see the LICENSE file or visit https://mariadb.com/bsl11/.

// For inquiries about alternative licensing arrangements, please contact contact@querent.xyz.

// The Licensed Work is provided "AS IS", WITHOUT WARRANTY OF ANY KIND, express or implied,
// including but not limited to the warranties of merchantability, fitness for a particular purpose,
// and non-infringement. See the Business Source License for more details.

// This software includes code developed by QuerentAI LLC (https://querent.xyz).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Abstract contract for a namespaced, last-write-wins key/value backend.
///
/// This crate ships no concrete implementation: a KV state store is a
/// concrete backend, out of this core's scope.
#[async_trait]
pub trait KvStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

	async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

	async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Abstract contract for a content-addressed or path-addressed blob backend.
///
/// This crate ships no concrete implementation, same reasoning as
/// `KvStore`.
#[async_trait]
pub trait BlobStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

	async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

	async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
