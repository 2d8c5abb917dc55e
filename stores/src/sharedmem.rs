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

/// A small typed coordination surface for cross-actor data structures:
/// key/value (last-write-wins), append-only lists, hashes, sets, and atomic
/// counters. Every operation accepts an optional TTL. Operations are
/// individually atomic; no multi-key transactions are provided.
#[async_trait]
pub trait SharedMemoryStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

	async fn set(&self, key: &str, value: Value, ttl_ms: Option<i64>) -> Result<(), StoreError>;

	async fn list_append(&self, key: &str, value: Value, ttl_ms: Option<i64>) -> Result<(), StoreError>;

	async fn list_get(&self, key: &str) -> Result<Vec<Value>, StoreError>;

	async fn hash_set(&self, key: &str, field: &str, value: Value, ttl_ms: Option<i64>) -> Result<(), StoreError>;

	async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, Value)>, StoreError>;

	async fn set_add(&self, key: &str, member: String, ttl_ms: Option<i64>) -> Result<(), StoreError>;

	async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

	/// Atomically adds `delta` to the integer counter at `key` (creating it
	/// at 0 if absent) and returns the new value.
	async fn incr(&self, key: &str, delta: i64, ttl_ms: Option<i64>) -> Result<i64, StoreError>;
}
