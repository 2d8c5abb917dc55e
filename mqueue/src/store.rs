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

use std::{
	cmp::Ordering,
	collections::{BinaryHeap, HashMap},
	sync::{Arc, Mutex},
	time::Duration,
};

use async_trait::async_trait;
use stores::{Message, QueueStore, StoreError};

struct HeapEntry {
	priority: i64,
	seq: u64,
	message: Message,
}

impl PartialEq for HeapEntry {
	fn eq(&self, other: &Self) -> bool {
		self.priority == other.priority && self.seq == other.seq
	}
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for HeapEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		// Larger priority first; ties broken by earliest enqueue order
		// (smaller seq first), which means the reverse on seq since
		// `BinaryHeap` is a max-heap.
		self.priority.cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq))
	}
}

#[derive(Default)]
struct Topic {
	next_seq: u64,
	heap: BinaryHeap<HeapEntry>,
	in_flight: HashMap<String, Message>,
}

/// In-memory implementation of [`stores::QueueStore`]: a priority-ordered
/// FIFO per topic, ties broken by enqueue order.
#[derive(Clone, Default)]
pub struct MemoryQueueStore {
	topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl MemoryQueueStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn requeue(&self, topic_name: &str, message: Message) {
		let mut topics = self.topics.lock().unwrap();
		let topic = topics.entry(topic_name.to_string()).or_default();
		let seq = topic.next_seq;
		topic.next_seq += 1;
		topic.heap.push(HeapEntry { priority: message.metadata.priority, seq, message });
	}
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
	async fn enqueue(&self, topic: &str, message: Message) -> Result<(), StoreError> {
		self.requeue(topic, message);
		Ok(())
	}

	async fn dequeue(&self, topic: &str) -> Result<Option<Message>, StoreError> {
		let mut topics = self.topics.lock().unwrap();
		let Some(queue) = topics.get_mut(topic) else {
			return Ok(None);
		};
		let Some(entry) = queue.heap.pop() else {
			return Ok(None);
		};
		queue.in_flight.insert(entry.message.message_id.clone(), entry.message.clone());
		Ok(Some(entry.message))
	}

	async fn ack(&self, topic: &str, message_id: &str) -> Result<(), StoreError> {
		let mut topics = self.topics.lock().unwrap();
		if let Some(queue) = topics.get_mut(topic) {
			queue.in_flight.remove(message_id);
		}
		Ok(())
	}

	async fn nack(&self, topic: &str, message_id: &str, retry_in_ms: Option<i64>) -> Result<(), StoreError> {
		let message = {
			let mut topics = self.topics.lock().unwrap();
			let Some(queue) = topics.get_mut(topic) else {
				return Ok(());
			};
			let Some(mut message) = queue.in_flight.remove(message_id) else {
				return Ok(());
			};
			message.metadata.attempt += 1;
			message
		};
		match retry_in_ms {
			Some(delay_ms) if delay_ms > 0 => {
				let store = self.clone();
				let topic = topic.to_string();
				tokio::spawn(async move {
					tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
					store.requeue(&topic, message);
				});
			},
			_ => self.requeue(topic, message),
		}
		Ok(())
	}

	async fn len(&self, topic: &str) -> Result<usize, StoreError> {
		let topics = self.topics.lock().unwrap();
		Ok(topics.get(topic).map(|queue| queue.heap.len()).unwrap_or(0))
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use stores::MessageMetadata;

	use super::*;

	fn message(id: &str, priority: i64) -> Message {
		Message {
			message_id: id.to_string(),
			actor_id: "a1".to_string(),
			payload: json!({}),
			metadata: MessageMetadata { priority, ..Default::default() },
		}
	}

	#[tokio::test]
	async fn test_higher_priority_dequeues_first() {
		let store = MemoryQueueStore::new();
		store.enqueue("t", message("low", 0)).await.unwrap();
		store.enqueue("t", message("high", 10)).await.unwrap();
		let first = store.dequeue("t").await.unwrap().unwrap();
		assert_eq!(first.message_id, "high");
	}

	#[tokio::test]
	async fn test_ties_broken_by_enqueue_order() {
		let store = MemoryQueueStore::new();
		store.enqueue("t", message("first", 5)).await.unwrap();
		store.enqueue("t", message("second", 5)).await.unwrap();
		assert_eq!(store.dequeue("t").await.unwrap().unwrap().message_id, "first");
		assert_eq!(store.dequeue("t").await.unwrap().unwrap().message_id, "second");
	}

	#[tokio::test]
	async fn test_ack_removes_in_flight_message() {
		let store = MemoryQueueStore::new();
		store.enqueue("t", message("m1", 0)).await.unwrap();
		let msg = store.dequeue("t").await.unwrap().unwrap();
		store.ack("t", &msg.message_id).await.unwrap();
		assert_eq!(store.len("t").await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_nack_without_delay_requeues_immediately() {
		let store = MemoryQueueStore::new();
		store.enqueue("t", message("m1", 0)).await.unwrap();
		let msg = store.dequeue("t").await.unwrap().unwrap();
		store.nack("t", &msg.message_id, None).await.unwrap();
		let redelivered = store.dequeue("t").await.unwrap().unwrap();
		assert_eq!(redelivered.metadata.attempt, 1);
	}

	#[tokio::test]
	async fn test_nack_with_delay_requeues_later() {
		let store = MemoryQueueStore::new();
		store.enqueue("t", message("m1", 0)).await.unwrap();
		let msg = store.dequeue("t").await.unwrap().unwrap();
		store.nack("t", &msg.message_id, Some(20)).await.unwrap();
		assert!(store.dequeue("t").await.unwrap().is_none());
		tokio::time::sleep(Duration::from_millis(60)).await;
		assert!(store.dequeue("t").await.unwrap().is_some());
	}
}
