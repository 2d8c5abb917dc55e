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

//! Drains the transactional outbox FIFO and applies each record to the
//! pipeline's coordination channel exactly once, keyed by
//! `(pipelineId, stageName, taskId)` so a record replayed after a crash
//! (found pending again before its delete landed) is a no-op on re-apply.

use std::{
	collections::HashSet,
	sync::{Arc, Mutex},
};

use async_trait::async_trait;
use stores::{OutboxRecord, OutboxStore};
use tracing::debug;

use crate::error::PipelineError;

#[async_trait]
pub trait StageCompletionSink: Send + Sync {
	async fn apply(&self, record: &OutboxRecord);
}

pub struct OutboxRelay {
	store: Arc<dyn OutboxStore>,
}

impl OutboxRelay {
	pub fn new(store: Arc<dyn OutboxStore>) -> Self {
		OutboxRelay { store }
	}

	/// Drains up to `limit` pending records for `pipeline_id`, applies each
	/// to `sink`, and deletes it only once applied. Returns the number
	/// drained.
	pub async fn drain(&self, pipeline_id: &str, sink: &dyn StageCompletionSink, limit: usize) -> Result<usize, PipelineError> {
		let pending = self.store.take_pending(pipeline_id, limit).await?;
		for record in &pending {
			sink.apply(record).await;
			self.store.delete(&record.outbox_id).await?;
		}
		Ok(pending.len())
	}
}

/// Applies each record's key at most once even if the same record is
/// drained twice, demonstrating the idempotent-apply contract the outbox
/// relay is built around. Wraps another sink that does the real work.
pub struct IdempotentSink<S> {
	seen: Mutex<HashSet<(String, String, String)>>,
	inner: S,
}

impl<S> IdempotentSink<S> {
	pub fn new(inner: S) -> Self {
		IdempotentSink { seen: Mutex::new(HashSet::new()), inner }
	}
}

#[async_trait]
impl<S: StageCompletionSink> StageCompletionSink for IdempotentSink<S> {
	async fn apply(&self, record: &OutboxRecord) {
		let key = (record.pipeline_id.clone(), record.stage_name.clone(), record.task_id.clone());
		let is_new = self.seen.lock().expect("outbox dedup lock poisoned").insert(key);
		if !is_new {
			debug!(outbox_id = %record.outbox_id, "skipping already-applied outbox record");
			return;
		}
		self.inner.apply(record).await;
	}
}
