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

//! Materializes durable actors on demand: acquires the per-actor lease,
//! replays its journal, dispatches to its behavior, and persists whatever
//! the activation produced, evicting idle instances from a bounded pool
//! since their state always lives durably in the journal store.

mod activation;
mod error;
mod pool;

pub use activation::{ActivationResult, ActivityOutcome, ActorRuntime, ActorRuntimeConfig, DispatchRequests};
pub use error::RuntimeError;
pub use pool::ActorPool;

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use actor_core::{ActorContext, ActorTypeRegistry, DurableActor, ExecutionOutcome, Suspension};
	use async_trait::async_trait;
	use journal::MemoryJournalStore;
	use lock_service::{LockService, MemoryLockStore};
	use serde_json::{json, Value};
	use stores::{LockStore, Message};

	use super::*;

	struct Counter;

	#[async_trait]
	impl DurableActor for Counter {
		async fn execute(&self, ctx: &mut ActorContext, input: Value) -> Result<ExecutionOutcome, actor_core::ActorCoreError> {
			let delta = input.get("delta").and_then(Value::as_i64).unwrap_or(0);
			ctx.update_state(|state| {
				let current = state.get("total").and_then(Value::as_i64).unwrap_or(0);
				json!({ "total": current + delta })
			})?;
			Ok(ExecutionOutcome::Completed(ctx.state().clone()))
		}
	}

	struct WaitsForApproval;

	#[async_trait]
	impl DurableActor for WaitsForApproval {
		async fn execute(&self, ctx: &mut ActorContext, input: Value) -> Result<ExecutionOutcome, actor_core::ActorCoreError> {
			ctx.update_state(|_| input.clone())?;
			match ctx.call_activity("approve", input)? {
				Suspension::Pending(_) => Ok(ExecutionOutcome::Suspended),
				Suspension::Completed(result) => Ok(ExecutionOutcome::Completed(result)),
				Suspension::Failed(error) => Ok(ExecutionOutcome::Failed(error)),
			}
		}
	}

	fn runtime(registry: ActorTypeRegistry) -> ActorRuntime {
		let journal: Arc<dyn stores::JournalStore> = Arc::new(MemoryJournalStore::new());
		let locks = LockService::new(Arc::new(MemoryLockStore::new()));
		ActorRuntime::new(journal, locks, Arc::new(registry), ActorRuntimeConfig::default())
	}

	fn message(actor_id: &str, payload: Value) -> Message {
		Message { message_id: common::quid::new_quid("msg"), actor_id: actor_id.to_string(), payload, metadata: Default::default() }
	}

	#[tokio::test]
	async fn test_invoke_completes_and_persists_state() {
		let mut registry = ActorTypeRegistry::new();
		registry.register("counter", || Box::new(Counter));
		let runtime = runtime(registry);
		let result = runtime.invoke("counter", message("a1", json!({"delta": 5}))).await.unwrap();
		assert!(matches!(result.outcome, ExecutionOutcome::Completed(_)));
	}

	#[tokio::test]
	async fn test_two_messages_accumulate_state_across_activations() {
		let mut registry = ActorTypeRegistry::new();
		registry.register("counter", || Box::new(Counter));
		let runtime = runtime(registry);
		runtime.invoke("counter", message("a1", json!({"delta": 5}))).await.unwrap();
		let second = runtime.invoke("counter", message("a1", json!({"delta": 3}))).await.unwrap();
		match second.outcome {
			ExecutionOutcome::Completed(state) => assert_eq!(state["total"], json!(8)),
			other => panic!("expected Completed, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_activity_call_suspends_then_resumes() {
		let mut registry = ActorTypeRegistry::new();
		registry.register("approval", || Box::new(WaitsForApproval));
		let runtime = runtime(registry);
		let first = runtime.invoke("approval", message("a1", json!({"doc": "x"}))).await.unwrap();
		assert!(matches!(first.outcome, ExecutionOutcome::Suspended));
		assert_eq!(first.dispatch.scheduled_activities.len(), 1);
		let (activity_id, name, _input) = &first.dispatch.scheduled_activities[0];
		assert_eq!(name, "approve");
		let resumed = runtime
			.resume_with_activity("approval", "a1", activity_id, ActivityOutcome::Completed(json!({"approved": true})))
			.await
			.unwrap();
		match resumed.outcome {
			ExecutionOutcome::Completed(result) => assert_eq!(result, json!({"approved": true})),
			other => panic!("expected Completed, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_compaction_trims_the_raw_journal_after_threshold() {
		let mut registry = ActorTypeRegistry::new();
		registry.register("counter", || Box::new(Counter));
		let journal: Arc<dyn stores::JournalStore> = Arc::new(MemoryJournalStore::new());
		let locks = LockService::new(Arc::new(MemoryLockStore::new()));
		let runtime = ActorRuntime::new(journal.clone(), locks, Arc::new(registry), ActorRuntimeConfig::default());
		for _ in 0..100 {
			runtime.invoke("counter", message("a1", json!({"delta": 1}))).await.unwrap();
		}
		// Auto-compaction must have fired by now: every `Invocation` entry
		// occupies a raw storage slot too, so a cursor computed only from
		// replayable entries would undercount and leave residue here.
		assert_eq!(journal.read_entries("a1").await.unwrap().len(), 0);
		let snapshot = journal.get_latest_snapshot("a1").await.unwrap().unwrap();
		assert_eq!(snapshot.state["total"], json!(100));

		// The next activation must not replay anything stale: an undercounted
		// cursor would feed leftover pre-snapshot `StateUpdated` entries back
		// in as history and silently roll the total backwards instead of
		// advancing it.
		let after = runtime.invoke("counter", message("a1", json!({"delta": 1}))).await.unwrap();
		match after.outcome {
			ExecutionOutcome::Completed(state) => assert_eq!(state["total"], json!(101)),
			other => panic!("expected Completed, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_concurrent_invocation_is_refused_by_lease() {
		let mut registry = ActorTypeRegistry::new();
		registry.register("approval", || Box::new(WaitsForApproval));
		let journal: Arc<dyn stores::JournalStore> = Arc::new(MemoryJournalStore::new());
		let lock_store = Arc::new(MemoryLockStore::new());
		let locks = LockService::new(lock_store.clone());
		let runtime = ActorRuntime::new(journal, locks, Arc::new(registry), ActorRuntimeConfig::default());
		let held = lock_store.acquire("actor:a1", "someone-else", 10_000).await.unwrap();
		assert!(held.is_some());
		let err = runtime.invoke("approval", message("a1", json!({}))).await.unwrap_err();
		assert!(matches!(err, RuntimeError::LeaseConflict(_)));
	}
}
