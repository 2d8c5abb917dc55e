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

use crate::{error::StoreError, model::Message};

/// Low-level durable storage contract for a single FIFO-with-priority
/// topic. `mqueue` builds retry/backoff, dead-lettering and worker pools on
/// top of this.
#[async_trait]
pub trait QueueStore: Send + Sync {
	/// Durably stores `message` under `topic`, visible to `dequeue`
	/// immediately.
	async fn enqueue(&self, topic: &str, message: Message) -> Result<(), StoreError>;

	/// Removes and returns the highest-priority message in `topic`
	/// (ties broken by enqueue order), or `None` if empty. The message is
	/// considered in-flight until `ack`/`nack`.
	async fn dequeue(&self, topic: &str) -> Result<Option<Message>, StoreError>;

	/// Permanently removes an in-flight message from `topic`.
	async fn ack(&self, topic: &str, message_id: &str) -> Result<(), StoreError>;

	/// Returns an in-flight message to `topic`, optionally after
	/// `retry_in_ms`, incrementing its `attempt` counter.
	async fn nack(&self, topic: &str, message_id: &str, retry_in_ms: Option<i64>) -> Result<(), StoreError>;

	/// Number of messages currently visible (not in-flight) in `topic`.
	async fn len(&self, topic: &str) -> Result<usize, StoreError>;

	async fn is_empty(&self, topic: &str) -> Result<bool, StoreError> {
		Ok(self.len(topic).await? == 0)
	}
}
