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

use std::{sync::Arc, time::Duration};

use anyhow::Error as AnyError;
use common::retry::RetryParams;
use stores::{Message, QueueStore};
use tracing::{error, info, warn};

/// Bounds retry/backoff and dead-lettering for one queue's worker pool.
#[derive(Clone)]
pub struct QueueConfig {
	/// Number of delivery attempts (including the first) before a message
	/// is moved to the dead-letter topic.
	pub max_attempts: u32,
	pub retry: RetryParams,
}

impl Default for QueueConfig {
	fn default() -> Self {
		QueueConfig { max_attempts: 5, retry: RetryParams::default() }
	}
}

/// Builds the `actor:<actorId>` topic name a message for `actor_id` is
/// routed to.
pub fn topic_for_actor(actor_id: &str) -> String {
	format!("actor:{actor_id}")
}

/// Builds the dead-letter topic name for a given source topic.
pub fn dlq_topic(topic: &str) -> String {
	format!("{topic}-dlq")
}

/// A priority FIFO queue bound to a [`QueueStore`] backend, with a worker
/// pool that polls, invokes a handler, and acks/nacks per the outcome.
pub struct MessageQueue<S: QueueStore> {
	store: Arc<S>,
	config: QueueConfig,
}

impl<S: QueueStore + 'static> MessageQueue<S> {
	pub fn new(store: Arc<S>, config: QueueConfig) -> Self {
		MessageQueue { store, config }
	}

	pub async fn enqueue(&self, topic: &str, message: Message) -> Result<(), stores::StoreError> {
		self.store.enqueue(topic, message).await
	}

	/// Spawns `concurrency` worker tasks polling `topic`. On handler success
	/// the message is acked; on failure it is nacked with exponential
	/// backoff-with-jitter, or moved to `dlq_topic(topic)` once
	/// `max_attempts` delivery attempts have been made.
	///
	/// `handler` must be cheap to clone (e.g. an `Arc`-wrapped closure);
	/// each worker task owns its own clone.
	pub fn start_worker<H, Fut>(&self, topic: &str, concurrency: usize, handler: H) -> Vec<tokio::task::JoinHandle<()>>
	where
		H: Fn(Message) -> Fut + Send + Sync + 'static,
		Fut: std::future::Future<Output = Result<(), AnyError>> + Send,
	{
		let handler = Arc::new(handler);
		let dlq = dlq_topic(topic);
		(0..concurrency)
			.map(|_| {
				let store = self.store.clone();
				let topic = topic.to_string();
				let dlq = dlq.clone();
				let handler = handler.clone();
				let config = self.config.clone();
				tokio::spawn(async move { worker_loop(store, topic, dlq, handler, config).await })
			})
			.collect()
	}
}

async fn worker_loop<S, H, Fut>(store: Arc<S>, topic: String, dlq: String, handler: Arc<H>, config: QueueConfig)
where
	S: QueueStore,
	H: Fn(Message) -> Fut + Send + Sync,
	Fut: std::future::Future<Output = Result<(), AnyError>> + Send,
{
	loop {
		let message = match store.dequeue(&topic).await {
			Ok(Some(message)) => message,
			Ok(None) => {
				tokio::time::sleep(Duration::from_millis(50)).await;
				continue;
			},
			Err(err) => {
				error!(%topic, error = %err, "queue dequeue failed");
				tokio::time::sleep(Duration::from_millis(200)).await;
				continue;
			},
		};
		let message_id = message.message_id.clone();
		let attempt = message.metadata.attempt;
		match handler(message.clone()).await {
			Ok(()) => {
				if let Err(err) = store.ack(&topic, &message_id).await {
					error!(%topic, %message_id, error = %err, "failed to ack message");
				}
			},
			Err(err) if attempt + 1 >= config.max_attempts => {
				warn!(%topic, %message_id, attempts = attempt + 1, error = %err, "exhausted retries, dead-lettering");
				if let Err(err) = store.ack(&topic, &message_id).await {
					error!(%topic, %message_id, error = %err, "failed to clear in-flight message before dead-lettering");
				}
				if let Err(err) = store.enqueue(&dlq, message).await {
					error!(%dlq, %message_id, error = %err, "failed to dead-letter message");
				}
			},
			Err(err) => {
				let delay_ms = config.retry.compute_delay(attempt as usize + 1).as_millis() as i64;
				info!(%topic, %message_id, attempt, delay_ms, error = %err, "nacking message for retry");
				if let Err(err) = store.nack(&topic, &message_id, Some(delay_ms)).await {
					error!(%topic, %message_id, error = %err, "failed to nack message");
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use serde_json::json;
	use stores::MessageMetadata;

	use super::*;
	use crate::store::MemoryQueueStore;

	fn message(id: &str) -> Message {
		Message {
			message_id: id.to_string(),
			actor_id: "a1".to_string(),
			payload: json!({}),
			metadata: MessageMetadata::default(),
		}
	}

	#[tokio::test]
	async fn test_successful_handler_acks_message() {
		let store = Arc::new(MemoryQueueStore::new());
		let queue = MessageQueue::new(store.clone(), QueueConfig::default());
		queue.enqueue("t", message("m1")).await.unwrap();
		let handles = queue.start_worker("t", 1, |_msg| async move { Ok(()) });
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(store.len("t").await.unwrap(), 0);
		for handle in handles {
			handle.abort();
		}
	}

	#[tokio::test]
	async fn test_failing_handler_dead_letters_after_max_attempts() {
		let store = Arc::new(MemoryQueueStore::new());
		let config = QueueConfig { max_attempts: 2, retry: RetryParams { base_delay: Duration::from_millis(5), ..Default::default() } };
		let queue = MessageQueue::new(store.clone(), config);
		queue.enqueue("t", message("m1")).await.unwrap();
		let attempts = Arc::new(AtomicUsize::new(0));
		let attempts_clone = attempts.clone();
		let handles = queue.start_worker("t", 1, move |_msg| {
			attempts_clone.fetch_add(1, Ordering::SeqCst);
			async move { Err(anyhow::anyhow!("boom")) }
		});
		tokio::time::sleep(Duration::from_millis(300)).await;
		assert_eq!(store.len(&dlq_topic("t")).await.unwrap(), 1);
		assert_eq!(attempts.load(Ordering::SeqCst), 2);
		for handle in handles {
			handle.abort();
		}
	}
}
