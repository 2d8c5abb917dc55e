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

//! An in-memory transactional outbox, in the style of `MemoryJournalStore`
//! and `MemoryQueueStore`: good enough to exercise the write-then-drain
//! contract in tests, not a durability story on its own.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use stores::{OutboxRecord, OutboxState, OutboxStore, StoreError};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MemoryOutboxStore {
	records: Arc<Mutex<HashMap<String, OutboxRecord>>>,
}

impl MemoryOutboxStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl OutboxStore for MemoryOutboxStore {
	async fn put(&self, record: OutboxRecord) -> Result<(), StoreError> {
		self.records.lock().await.insert(record.outbox_id.clone(), record);
		Ok(())
	}

	async fn take_pending(&self, pipeline_id: &str, limit: usize) -> Result<Vec<OutboxRecord>, StoreError> {
		let records = self.records.lock().await;
		let mut pending: Vec<OutboxRecord> = records
			.values()
			.filter(|record| record.pipeline_id == pipeline_id && record.state == OutboxState::Pending)
			.cloned()
			.collect();
		pending.sort_by(|a, b| a.outbox_id.cmp(&b.outbox_id));
		pending.truncate(limit);
		Ok(pending)
	}

	async fn delete(&self, outbox_id: &str) -> Result<(), StoreError> {
		self.records.lock().await.remove(outbox_id);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn record(id: &str, pipeline_id: &str) -> OutboxRecord {
		OutboxRecord {
			outbox_id: id.to_string(),
			pipeline_id: pipeline_id.to_string(),
			stage_name: "fetch".to_string(),
			task_id: "t1".to_string(),
			payload: json!({"ok": true}),
			state: OutboxState::Pending,
		}
	}

	#[tokio::test]
	async fn take_pending_only_returns_requested_pipeline() {
		let store = MemoryOutboxStore::new();
		store.put(record("o1", "p1")).await.unwrap();
		store.put(record("o2", "p2")).await.unwrap();
		let pending = store.take_pending("p1", 10).await.unwrap();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].outbox_id, "o1");
	}

	#[tokio::test]
	async fn delete_removes_the_record() {
		let store = MemoryOutboxStore::new();
		store.put(record("o1", "p1")).await.unwrap();
		store.delete("o1").await.unwrap();
		assert!(store.take_pending("p1", 10).await.unwrap().is_empty());
	}
}
