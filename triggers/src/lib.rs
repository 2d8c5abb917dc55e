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

//! Binds external event sources (webhooks, queues, polls) to actor types.
//! An adapter notices an event and hands it to the manager, which verifies,
//! filters, and transforms it before dispatching it to the runtime as a
//! message for the bound actor type.

mod adapter;
mod dispatch;
mod error;
mod manager;
mod model;
mod reference_adapters;

pub use adapter::{TriggerAdapter, TriggerSink};
pub use dispatch::TriggerDispatch;
pub use error::TriggerError;
pub use manager::TriggerManager;
pub use model::{RawEvent, TriggerBinding, VerificationOutcome};
pub use reference_adapters::{BearerTokenAdapter, HmacAdapter};

#[cfg(test)]
mod tests {
	use std::sync::{Arc, Mutex as StdMutex};

	use async_trait::async_trait;
	use serde_json::{json, Value};

	use super::*;

	struct RecordingDispatch {
		calls: StdMutex<Vec<(String, Value)>>,
	}

	impl RecordingDispatch {
		fn new() -> Self {
			RecordingDispatch { calls: StdMutex::new(Vec::new()) }
		}
	}

	#[async_trait]
	impl TriggerDispatch for RecordingDispatch {
		async fn dispatch(&self, actor_type: &str, payload: Value) -> Result<(), TriggerError> {
			self.calls.lock().unwrap().push((actor_type.to_string(), payload));
			Ok(())
		}
	}

	#[tokio::test]
	async fn accepted_event_is_transformed_and_dispatched() {
		let dispatch = Arc::new(RecordingDispatch::new());
		let manager = Arc::new(TriggerManager::new(dispatch.clone()));
		let adapter = Arc::new(BearerTokenAdapter::new("webhook", |token| token == "secret"));
		let binding = TriggerBinding::new("ingest-actor")
			.require_verification()
			.with_transform(|event| json!({ "wrapped": event.payload }));

		manager.register(adapter.clone(), binding).await;
		manager.start_all().await.unwrap();

		adapter
			.receive(RawEvent::new(json!({"id": 1})).with_metadata("authorization", "Bearer secret"))
			.await;

		let calls = dispatch.calls.lock().unwrap();
		assert_eq!(calls.len(), 1);
		assert_eq!(calls[0].0, "ingest-actor");
		assert_eq!(calls[0].1, json!({ "wrapped": { "id": 1 } }));
	}

	#[tokio::test]
	async fn verification_failure_drops_the_event() {
		let dispatch = Arc::new(RecordingDispatch::new());
		let manager = Arc::new(TriggerManager::new(dispatch.clone()));
		let adapter = Arc::new(BearerTokenAdapter::new("webhook", |token| token == "secret"));
		let binding = TriggerBinding::new("ingest-actor").require_verification();

		manager.register(adapter.clone(), binding).await;
		manager.start_all().await.unwrap();

		adapter
			.receive(RawEvent::new(json!({"id": 1})).with_metadata("authorization", "Bearer wrong"))
			.await;

		assert!(dispatch.calls.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn filter_drops_events_before_dispatch() {
		let dispatch = Arc::new(RecordingDispatch::new());
		let manager = Arc::new(TriggerManager::new(dispatch.clone()));
		let adapter = Arc::new(BearerTokenAdapter::new("webhook", |_| true));
		let binding = TriggerBinding::new("ingest-actor")
			.with_filter(|event| event.payload.get("kind").and_then(Value::as_str) == Some("wanted"));

		manager.register(adapter.clone(), binding).await;
		manager.start_all().await.unwrap();

		adapter.receive(RawEvent::new(json!({"kind": "unwanted"}))).await;
		adapter.receive(RawEvent::new(json!({"kind": "wanted"}))).await;

		let calls = dispatch.calls.lock().unwrap();
		assert_eq!(calls.len(), 1);
		assert_eq!(calls[0].1, json!({"kind": "wanted"}));
	}

	#[tokio::test]
	async fn unbound_adapter_event_is_dropped_without_panicking() {
		let dispatch = Arc::new(RecordingDispatch::new());
		let manager = TriggerManager::new(dispatch.clone());
		manager.on_trigger("nobody-registered-this", RawEvent::new(json!({}))).await;
		assert!(dispatch.calls.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn stop_all_stops_every_registered_adapter() {
		let dispatch = Arc::new(RecordingDispatch::new());
		let manager = Arc::new(TriggerManager::new(dispatch));
		let adapter = Arc::new(BearerTokenAdapter::new("webhook", |_| true));
		manager.register(adapter.clone(), TriggerBinding::new("ingest-actor")).await;
		manager.start_all().await.unwrap();
		assert!(adapter.is_started());
		manager.stop_all().await.unwrap();
		assert!(!adapter.is_started());
	}
}
