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

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
	adapter::{TriggerAdapter, TriggerSink},
	dispatch::TriggerDispatch,
	error::TriggerError,
	model::{RawEvent, TriggerBinding},
};

/// Owns a set of adapters and the bindings that say what to do with what
/// they notice: verify (if required), filter, transform, then dispatch to
/// the bound actor type. The manager is itself the [`TriggerSink`] every
/// adapter is started with, so one accept pipeline governs all of them.
pub struct TriggerManager {
	adapters: Mutex<HashMap<String, Arc<dyn TriggerAdapter>>>,
	bindings: Mutex<HashMap<String, TriggerBinding>>,
	dispatch: Arc<dyn TriggerDispatch>,
}

impl TriggerManager {
	pub fn new(dispatch: Arc<dyn TriggerDispatch>) -> Self {
		TriggerManager { adapters: Mutex::new(HashMap::new()), bindings: Mutex::new(HashMap::new()), dispatch }
	}

	/// Registers an adapter under its own name along with the binding
	/// governing how its accepted events become actor messages. Does not
	/// start the adapter; call [`TriggerManager::start_all`] once every
	/// adapter is registered.
	pub async fn register(&self, adapter: Arc<dyn TriggerAdapter>, binding: TriggerBinding) {
		let name = adapter.name().to_string();
		self.adapters.lock().await.insert(name.clone(), adapter);
		self.bindings.lock().await.insert(name, binding);
	}

	pub async fn start_all(self: &Arc<Self>) -> Result<(), TriggerError> {
		let adapters: Vec<_> = self.adapters.lock().await.values().cloned().collect();
		for adapter in adapters {
			adapter.start(self.clone() as Arc<dyn TriggerSink>).await?;
		}
		Ok(())
	}

	pub async fn stop_all(&self) -> Result<(), TriggerError> {
		let adapters: Vec<_> = self.adapters.lock().await.values().cloned().collect();
		for adapter in adapters {
			adapter.stop().await?;
		}
		Ok(())
	}

	async fn handle_event(&self, adapter_name: &str, event: RawEvent) -> Result<(), TriggerError> {
		let binding = self
			.bindings
			.lock()
			.await
			.get(adapter_name)
			.cloned()
			.ok_or_else(|| TriggerError::UnboundTrigger(adapter_name.to_string()))?;

		if binding.requires_verification {
			let adapter = self
				.adapters
				.lock()
				.await
				.get(adapter_name)
				.cloned()
				.ok_or_else(|| TriggerError::UnknownAdapter(adapter_name.to_string()))?;
			let outcome = adapter.verify(&event).await;
			if !outcome.valid {
				return Err(TriggerError::VerificationFailed(
					adapter_name.to_string(),
					outcome.reason.unwrap_or_else(|| "rejected".to_string()),
				));
			}
		}

		if let Some(filter) = &binding.filter {
			if !filter(&event) {
				tracing::debug!(adapter = adapter_name, "trigger event dropped by filter");
				return Ok(());
			}
		}

		let payload = match &binding.transform {
			Some(transform) => transform(event),
			None => event.payload,
		};

		self.dispatch.dispatch(&binding.actor_type, payload).await
	}
}

#[async_trait]
impl TriggerSink for TriggerManager {
	async fn on_trigger(&self, adapter_name: &str, event: RawEvent) {
		if let Err(err) = self.handle_event(adapter_name, event).await {
			tracing::warn!(adapter = adapter_name, error = %err, "dropping trigger event");
		}
	}
}
