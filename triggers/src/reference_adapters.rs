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

//! Two structural `TriggerAdapter` references: bearer-token and HMAC
//! signature verification. Neither pulls in a cryptography crate — the
//! actual check is an injected closure, so a caller that needs real
//! HMAC-SHA256 wires in whatever crate its deployment already trusts for
//! that, and a caller that just wants the shape (start/stop/verify wired to
//! an adapter name and event metadata) gets it for free.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
	adapter::{TriggerAdapter, TriggerSink},
	error::TriggerError,
	model::{RawEvent, VerificationOutcome},
};

struct AdapterState {
	sink: Option<Arc<dyn TriggerSink>>,
}

/// Verifies a `Authorization: Bearer <token>` header with an injected
/// predicate over the raw token.
pub struct BearerTokenAdapter {
	name: String,
	started: AtomicBool,
	state: Mutex<AdapterState>,
	accepts: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl BearerTokenAdapter {
	pub fn new(name: impl Into<String>, accepts: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
		BearerTokenAdapter {
			name: name.into(),
			started: AtomicBool::new(false),
			state: Mutex::new(AdapterState { sink: None }),
			accepts: Arc::new(accepts),
		}
	}

	pub fn is_started(&self) -> bool {
		self.started.load(Ordering::SeqCst)
	}

	/// Simulates the adapter's transport noticing an event (e.g. a webhook
	/// request landing) and forwarding it to whatever sink `start` was
	/// called with.
	pub async fn receive(&self, event: RawEvent) {
		let sink = self.state.lock().await.sink.clone();
		if let Some(sink) = sink {
			sink.on_trigger(&self.name, event).await;
		}
	}
}

#[async_trait]
impl TriggerAdapter for BearerTokenAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	async fn start(&self, sink: Arc<dyn TriggerSink>) -> Result<(), TriggerError> {
		self.state.lock().await.sink = Some(sink);
		self.started.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn stop(&self) -> Result<(), TriggerError> {
		self.state.lock().await.sink = None;
		self.started.store(false, Ordering::SeqCst);
		Ok(())
	}

	async fn verify(&self, event: &RawEvent) -> VerificationOutcome {
		match event.metadata.get("authorization").and_then(|header| header.strip_prefix("Bearer ")) {
			Some(token) if (self.accepts)(token) => VerificationOutcome::accept(),
			Some(_) => VerificationOutcome::reject("bearer token rejected"),
			None => VerificationOutcome::reject("missing bearer token"),
		}
	}
}

/// Verifies a signature header with an injected predicate over
/// `(payload, provided_signature)`, standing in for HMAC-SHA256 or
/// whatever scheme a deployment actually needs.
pub struct HmacAdapter {
	name: String,
	signature_header: String,
	started: AtomicBool,
	state: Mutex<AdapterState>,
	accepts: Arc<dyn Fn(&[u8], &str) -> bool + Send + Sync>,
}

impl HmacAdapter {
	pub fn new(name: impl Into<String>, signature_header: impl Into<String>, accepts: impl Fn(&[u8], &str) -> bool + Send + Sync + 'static) -> Self {
		HmacAdapter {
			name: name.into(),
			signature_header: signature_header.into(),
			started: AtomicBool::new(false),
			state: Mutex::new(AdapterState { sink: None }),
			accepts: Arc::new(accepts),
		}
	}

	pub fn is_started(&self) -> bool {
		self.started.load(Ordering::SeqCst)
	}

	pub async fn receive(&self, event: RawEvent) {
		let sink = self.state.lock().await.sink.clone();
		if let Some(sink) = sink {
			sink.on_trigger(&self.name, event).await;
		}
	}
}

#[async_trait]
impl TriggerAdapter for HmacAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	async fn start(&self, sink: Arc<dyn TriggerSink>) -> Result<(), TriggerError> {
		self.state.lock().await.sink = Some(sink);
		self.started.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn stop(&self) -> Result<(), TriggerError> {
		self.state.lock().await.sink = None;
		self.started.store(false, Ordering::SeqCst);
		Ok(())
	}

	async fn verify(&self, event: &RawEvent) -> VerificationOutcome {
		let Some(signature) = event.metadata.get(&self.signature_header) else {
			return VerificationOutcome::reject(format!("missing '{}' header", self.signature_header));
		};
		let payload = serde_json::to_vec(&event.payload).unwrap_or_default();
		if (self.accepts)(&payload, signature) {
			VerificationOutcome::accept()
		} else {
			VerificationOutcome::reject("signature mismatch")
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex as StdMutex;

	use serde_json::json;

	use super::*;

	struct RecordingSink {
		received: StdMutex<Vec<(String, RawEvent)>>,
	}

	#[async_trait]
	impl TriggerSink for RecordingSink {
		async fn on_trigger(&self, adapter_name: &str, event: RawEvent) {
			self.received.lock().unwrap().push((adapter_name.to_string(), event));
		}
	}

	#[tokio::test]
	async fn bearer_adapter_forwards_after_start() {
		let adapter = BearerTokenAdapter::new("webhook", |token| token == "secret");
		let sink = Arc::new(RecordingSink { received: StdMutex::new(Vec::new()) });
		adapter.start(sink.clone()).await.unwrap();
		assert!(adapter.is_started());
		adapter.receive(RawEvent::new(json!({"x": 1}))).await;
		assert_eq!(sink.received.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn bearer_adapter_verify_checks_header_and_predicate() {
		let adapter = BearerTokenAdapter::new("webhook", |token| token == "secret");
		let missing = adapter.verify(&RawEvent::new(json!({}))).await;
		assert!(!missing.valid);
		let wrong = adapter.verify(&RawEvent::new(json!({})).with_metadata("authorization", "Bearer nope")).await;
		assert!(!wrong.valid);
		let right = adapter.verify(&RawEvent::new(json!({})).with_metadata("authorization", "Bearer secret")).await;
		assert!(right.valid);
	}

	#[tokio::test]
	async fn hmac_adapter_verify_delegates_to_predicate() {
		let adapter = HmacAdapter::new("gh", "x-signature", |_payload, signature| signature == "valid-sig");
		let ok = adapter.verify(&RawEvent::new(json!({"a": 1})).with_metadata("x-signature", "valid-sig")).await;
		assert!(ok.valid);
		let bad = adapter.verify(&RawEvent::new(json!({"a": 1})).with_metadata("x-signature", "wrong")).await;
		assert!(!bad.valid);
	}

	#[tokio::test]
	async fn stop_clears_the_sink() {
		let adapter = BearerTokenAdapter::new("webhook", |_| true);
		let sink = Arc::new(RecordingSink { received: StdMutex::new(Vec::new()) });
		adapter.start(sink.clone()).await.unwrap();
		adapter.stop().await.unwrap();
		assert!(!adapter.is_started());
		adapter.receive(RawEvent::new(json!({}))).await;
		assert!(sink.received.lock().unwrap().is_empty());
	}
}
