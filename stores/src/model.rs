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

//! The data model shared by every store contract and by the actor core and
//! pipeline orchestrator built on top of them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ActorId = String;
pub type ActorType = String;
pub type ActivityId = String;
pub type MessageId = String;

/// A single entry in an actor's append-only journal.
///
/// Serialized with a `type` discriminator (see the `serde` tag below); an
/// unknown discriminator encountered on read is fatal, per the journal
/// entry serialization contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEntry {
	/// Snapshots the new state after a user mutation.
	StateUpdated { state: Value },
	/// An external call has been requested.
	ActivityScheduled { activity_id: ActivityId, name: String, input: Value },
	/// An activity completed successfully.
	ActivityCompleted { activity_id: ActivityId, result: Value },
	/// An activity failed.
	ActivityFailed { activity_id: ActivityId, error: String },
	/// A subordinate actor was created.
	ChildSpawned { child_id: ActorId, actor_type: ActorType, input: Value },
	/// An external event was delivered to a waiting actor.
	EventReceived { event_type: String, data: Value },
	/// A cooperative yield, not tied to an activity or event wait.
	Suspended { reason: String },
	/// The message that drove this slice of execution.
	Invocation { message_id: MessageId, timestamp: i64, payload: Value },
	/// Audit entry for policy-bearing actors; opaque to the core.
	DecisionMade { payload: Value },
    /// Audit entry for policy-bearing actors; opaque to the core.
	ContextGathered { payload: Value },
}

impl JournalEntry {
	/// Returns the `activityId` this entry concerns, if any.
	pub fn activity_id(&self) -> Option<&str> {
		match self {
			JournalEntry::ActivityScheduled { activity_id, .. } |
			JournalEntry::ActivityCompleted { activity_id, .. } |
			JournalEntry::ActivityFailed { activity_id, .. } => Some(activity_id),
			_ => None,
		}
	}
}

/// A snapshot summarizing all journal entries with index `< cursor`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
	pub state: Value,
	pub cursor: u64,
	/// Milliseconds since the Unix epoch.
	pub timestamp: i64,
}

/// Metadata attached to a queued message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageMetadata {
	/// RFC3339 timestamp of enqueue time.
	pub timestamp: String,
	/// Larger values are eligible for delivery first.
	#[serde(default)]
	pub priority: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub correlation_id: Option<String>,
	#[serde(default)]
	pub attempt: u32,
}

impl Default for MessageMetadata {
	fn default() -> Self {
		MessageMetadata {
			timestamp: chrono_now_rfc3339(),
			priority: 0,
			correlation_id: None,
			attempt: 0,
		}
	}
}

fn chrono_now_rfc3339() -> String {
	chrono::Utc::now().to_rfc3339()
}

/// A durable message routed to an actor's mailbox.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
	pub message_id: MessageId,
	pub actor_id: ActorId,
	pub payload: Value,
	#[serde(default)]
	pub metadata: MessageMetadata,
}

/// A fenced, exclusive reservation of a named resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lease {
	pub resource: String,
	pub fence_token: u64,
	pub held_by: String,
	/// Milliseconds since the Unix epoch.
	pub expires_at: i64,
}

/// The lifecycle of a pipeline stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
	Pending,
	Running,
	Waiting,
	Completed,
	Failed,
	Cancelled,
}

/// One task of a scatter/gather stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageTask {
	pub task_id: String,
	pub stage_name: String,
	pub pipeline_id: String,
	pub input: Value,
	pub status: StageState,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
}

/// The publication state of an outbox record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxState {
	Pending,
	Published,
}

/// A durable record published alongside a stage task's state update, relayed
/// to the pipeline's coordination channel and deleted only once acknowledged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutboxRecord {
	pub outbox_id: String,
	pub pipeline_id: String,
	pub stage_name: String,
	pub task_id: String,
	pub payload: Value,
	pub state: OutboxState,
}
