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

//! Drives the activation sequence described for the actor runtime: acquire
//! the actor's lease, load its latest snapshot, replay outstanding
//! entries, dispatch `execute`, persist what it produced, and compact the
//! journal when due.

use std::sync::Arc;

use actor_core::{compact_journal, ActorContext, ActorTypeRegistry, CompactionConfig, ExecutionOutcome};
use common::quid::new_quid;
use lock_service::LockService;
use serde_json::Value;
use stores::{ActivityId, ActorId, ActorType, JournalEntry, JournalStore, Message};
use tokio::sync::Mutex;

use crate::{error::RuntimeError, pool::ActorPool};

/// An outcome `resume_with_activity`/`resume_with_event` feed back into a
/// suspended actor.
#[derive(Clone, Debug)]
pub enum ActivityOutcome {
	Completed(Value),
	Failed(String),
}

/// Work a fresh or resumed activation asked the runtime to dispatch
/// externally: schedule an activity, or materialize a spawned child.
#[derive(Clone, Debug, Default)]
pub struct DispatchRequests {
	pub scheduled_activities: Vec<(ActivityId, String, Value)>,
	pub spawned_children: Vec<(ActorId, ActorType, Value)>,
}

/// What one activation produced.
#[derive(Clone, Debug)]
pub struct ActivationResult {
	pub outcome: ExecutionOutcome,
	pub dispatch: DispatchRequests,
}

#[derive(Clone, Copy, Debug)]
pub struct ActorRuntimeConfig {
	pub lease_ttl_ms: i64,
	pub max_pool_size: usize,
	pub compaction: CompactionConfig,
}

impl Default for ActorRuntimeConfig {
	fn default() -> Self {
		ActorRuntimeConfig { lease_ttl_ms: 30_000, max_pool_size: 100, compaction: CompactionConfig::default() }
	}
}

/// Materializes durable actors on demand, routes messages to them under an
/// exclusive lease, and persists every observable effect to the journal.
pub struct ActorRuntime {
	journal: Arc<dyn JournalStore>,
	locks: LockService,
	registry: Arc<ActorTypeRegistry>,
	pool: Mutex<ActorPool>,
	config: ActorRuntimeConfig,
}

impl ActorRuntime {
	pub fn new(
		journal: Arc<dyn JournalStore>,
		locks: LockService,
		registry: Arc<ActorTypeRegistry>,
		config: ActorRuntimeConfig,
	) -> Self {
		ActorRuntime { journal, locks, registry, pool: Mutex::new(ActorPool::new(config.max_pool_size)), config }
	}

	/// Handles a fresh inbound message: steps 1-7 of the activation
	/// sequence. Returns `Err(RuntimeError::LeaseConflict(_))` when another
	/// worker currently owns the actor; the caller should leave the
	/// message for redelivery.
	pub async fn invoke(&self, actor_type: &str, message: Message) -> Result<ActivationResult, RuntimeError> {
		let resource = format!("actor:{}", message.actor_id);
		let holder = new_quid("worker");
		let managed = self
			.locks
			.acquire(&resource, &holder, self.config.lease_ttl_ms)
			.await?
			.ok_or_else(|| RuntimeError::LeaseConflict(message.actor_id.clone()))?;
		self.pool.lock().await.touch(&message.actor_id);
		let result = self
			.run_activation(actor_type, &message.actor_id, message.payload, Some(&message.message_id))
			.await;
		managed.release().await?;
		result
	}

	/// Injects the outcome of a previously scheduled activity into a
	/// suspended actor and re-drives it forward.
	pub async fn resume_with_activity(
		&self,
		actor_type: &str,
		actor_id: &str,
		activity_id: &str,
		outcome: ActivityOutcome,
	) -> Result<ActivationResult, RuntimeError> {
		let entry = match outcome {
			ActivityOutcome::Completed(result) =>
				JournalEntry::ActivityCompleted { activity_id: activity_id.to_string(), result },
			ActivityOutcome::Failed(error) => JournalEntry::ActivityFailed { activity_id: activity_id.to_string(), error },
		};
		self.resume(actor_type, actor_id, entry).await
	}

	/// Injects an external event into a suspended actor and re-drives it
	/// forward.
	pub async fn resume_with_event(
		&self,
		actor_type: &str,
		actor_id: &str,
		event_type: &str,
		data: Value,
	) -> Result<ActivationResult, RuntimeError> {
		self.resume(actor_type, actor_id, JournalEntry::EventReceived { event_type: event_type.to_string(), data }).await
	}

	async fn resume(
		&self,
		actor_type: &str,
		actor_id: &str,
		resolution_entry: JournalEntry,
	) -> Result<ActivationResult, RuntimeError> {
		let resource = format!("actor:{actor_id}");
		let holder = new_quid("worker");
		let managed = self
			.locks
			.acquire(&resource, &holder, self.config.lease_ttl_ms)
			.await?
			.ok_or_else(|| RuntimeError::LeaseConflict(actor_id.to_string()))?;
		self.pool.lock().await.touch(actor_id);
		self.journal.append_entry(actor_id, resolution_entry).await?;
		let raw_entries = self.journal.read_entries(actor_id).await?;
		let payload = raw_entries
			.iter()
			.rev()
			.find_map(|entry| match entry {
				JournalEntry::Invocation { payload, .. } => Some(payload.clone()),
				_ => None,
			})
			.ok_or_else(|| RuntimeError::NothingToResume(actor_id.to_string()))?;
		let result = self.run_activation(actor_type, actor_id, payload, None).await;
		managed.release().await?;
		result
	}

	async fn run_activation(
		&self,
		actor_type: &str,
		actor_id: &str,
		payload: Value,
		message_id: Option<&str>,
	) -> Result<ActivationResult, RuntimeError> {
		let snapshot = self.journal.get_latest_snapshot(actor_id).await?;
		let (state, cursor) = match snapshot {
			Some(snapshot) => (snapshot.state, snapshot.cursor),
			None => (Value::Null, 0),
		};
		let raw_entries = self.journal.read_entries(actor_id).await?;
		// `trim_entries` drops by raw storage index, so the cursor math below must
		// count every entry physically in the log, not just the replayable subset
		// `ActorContext` is given.
		let raw_count_before = raw_entries.len() as u64;
		let mut invocation_appended = 0u64;
		if let Some(message_id) = message_id {
			let already_recorded = raw_entries
				.iter()
				.any(|entry| matches!(entry, JournalEntry::Invocation { message_id: recorded, .. } if recorded == message_id));
			if !already_recorded {
				let entry = JournalEntry::Invocation {
					message_id: message_id.to_string(),
					timestamp: now_millis(),
					payload: payload.clone(),
				};
				self.journal.append_entry(actor_id, entry).await?;
				invocation_appended = 1;
			}
		}
		let replay_entries: Vec<JournalEntry> = raw_entries.into_iter().filter(is_replayable).collect();
		let mut ctx = ActorContext::new(actor_id.to_string(), state, replay_entries);
		let actor = self.registry.build(actor_type)?;
		let outcome = actor.execute(&mut ctx, payload).await?;
		let new_state = ctx.state().clone();
		let appended = ctx.into_appended();
		let dispatch = dispatch_requests(&appended);
		for entry in &appended {
			self.journal.append_entry(actor_id, entry.clone()).await?;
		}
		let new_cursor = cursor + raw_count_before + invocation_appended + appended.len() as u64;
		let since_last_compaction = new_cursor - cursor;
		compact_journal(self.journal.as_ref(), actor_id, &new_state, new_cursor, since_last_compaction, &self.config.compaction)
			.await?;
		Ok(ActivationResult { outcome, dispatch })
	}
}

fn is_replayable(entry: &JournalEntry) -> bool {
	!matches!(entry, JournalEntry::Invocation { .. } | JournalEntry::DecisionMade { .. } | JournalEntry::ContextGathered { .. })
}

fn dispatch_requests(appended: &[JournalEntry]) -> DispatchRequests {
	let mut dispatch = DispatchRequests::default();
	for entry in appended {
		match entry {
			JournalEntry::ActivityScheduled { activity_id, name, input } =>
				dispatch.scheduled_activities.push((activity_id.clone(), name.clone(), input.clone())),
			JournalEntry::ChildSpawned { child_id, actor_type, input } =>
				dispatch.spawned_children.push((child_id.clone(), actor_type.clone(), input.clone())),
			_ => {},
		}
	}
	dispatch
}

fn now_millis() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_millis() as i64
}
