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

//! The replay-aware context threaded through a single activation of a
//! [`crate::DurableActor`]. The same user code path runs whether the
//! context is replaying history or executing live; the context itself
//! decides, at each suspension point, whether to hand back a recorded
//! outcome or to append a new entry and suspend.

use common::quid::new_quid;
use serde_json::Value;
use stores::{ActivityId, ActorId, ActorType, JournalEntry};

use crate::error::ActorCoreError;

/// The outcome of a suspension point (`call_activity`, `wait_for_event`,
/// `spawn_child`).
#[derive(Clone, Debug)]
pub enum Suspension {
	/// Fresh execution: the operation has been scheduled but has no
	/// recorded outcome yet. The caller must stop executing and return
	/// control to the runtime.
	Pending(ActivityId),
	/// Replay (or a since-delivered live resumption) found a recorded
	/// success.
	Completed(Value),
	/// Replay (or a since-delivered live resumption) found a recorded
	/// failure.
	Failed(String),
}

impl Suspension {
	pub fn is_pending(&self) -> bool {
		matches!(self, Suspension::Pending(_))
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
	/// Consuming entries already in the journal; suspension points must
	/// match the recorded history rather than appending to it.
	Replaying,
	/// Past the end of history; new suspension points append fresh
	/// entries.
	Executing,
}

/// Drives one activation (a single message's worth of execution) of a
/// durable actor: replays recorded entries up to the point execution last
/// left off, then lets user code run forward, appending newly produced
/// entries as it goes.
pub struct ActorContext {
	actor_id: ActorId,
	state: Value,
	history: Vec<JournalEntry>,
	replay_pos: usize,
	mode: Mode,
	appended: Vec<JournalEntry>,
}

impl ActorContext {
	/// Builds a context from the actor's current state and the full,
	/// untrimmed-relative history it must replay before live execution may
	/// proceed. `history` contains only the entries after the last
	/// snapshot's cursor; `state` is the snapshot's state (or the type's
	/// default if there is none yet).
	pub fn new(actor_id: ActorId, state: Value, history: Vec<JournalEntry>) -> Self {
		let mode = if history.is_empty() { Mode::Executing } else { Mode::Replaying };
		ActorContext { actor_id, state, history, replay_pos: 0, mode, appended: Vec::new() }
	}

	pub fn actor_id(&self) -> &str {
		&self.actor_id
	}

	pub fn state(&self) -> &Value {
		&self.state
	}

	/// Whether every recorded entry has been consumed; `false` mid-replay.
	pub fn is_caught_up(&self) -> bool {
		self.mode == Mode::Executing
	}

	/// The entries appended during this activation, to be persisted by the
	/// runtime in the order returned.
	pub fn into_appended(self) -> Vec<JournalEntry> {
		self.appended
	}

	fn next_history(&mut self) -> Option<&JournalEntry> {
		if self.mode == Mode::Replaying {
			let entry = self.history.get(self.replay_pos);
			if entry.is_some() {
				self.replay_pos += 1;
				if self.replay_pos >= self.history.len() {
					self.mode = Mode::Executing;
				}
			}
			entry
		} else {
			None
		}
	}

	/// Produces new state via `mutator`, which is only invoked on fresh
	/// execution; on replay the recorded state is adopted directly.
	pub fn update_state(&mut self, mutator: impl FnOnce(&Value) -> Value) -> Result<(), ActorCoreError> {
		if self.mode == Mode::Replaying {
			let cursor = self.replay_pos as u64;
			match self.next_history() {
				Some(JournalEntry::StateUpdated { state }) => {
					self.state = state.clone();
					Ok(())
				},
				Some(other) =>
					Err(ActorCoreError::ReplayMismatch {
						cursor,
						detail: format!("expected state_updated, found {other:?}"),
					}),
				None => unreachable!("next_history returned None while still Replaying"),
			}
		} else {
			let new_state = mutator(&self.state);
			self.state = new_state.clone();
			self.appended.push(JournalEntry::StateUpdated { state: new_state });
			Ok(())
		}
	}

	/// During fresh execution, schedules `name(input)` and suspends.
	/// During replay, short-circuits to the recorded completion, or to
	/// `Suspension::Pending` if history ends exactly at the scheduled
	/// entry (the activity has not resolved yet).
	pub fn call_activity(&mut self, name: &str, input: Value) -> Result<Suspension, ActorCoreError> {
		if self.mode == Mode::Replaying {
			let cursor = self.replay_pos as u64;
			let activity_id = match self.next_history() {
				Some(JournalEntry::ActivityScheduled { activity_id, name: recorded_name, .. }) => {
					if recorded_name != name {
						return Err(ActorCoreError::ReplayMismatch {
							cursor,
							detail: format!(
								"expected activity '{name}' at this point, found '{recorded_name}'"
							),
						});
					}
					activity_id.clone()
				},
				Some(other) =>
					return Err(ActorCoreError::ReplayMismatch {
						cursor,
						detail: format!("expected activity_scheduled, found {other:?}"),
					}),
				None => unreachable!("next_history returned None while still Replaying"),
			};
			self.resolve_activity(&activity_id)
		} else {
			let activity_id = new_quid("activity");
			self.appended.push(JournalEntry::ActivityScheduled {
				activity_id: activity_id.clone(),
				name: name.to_string(),
				input,
			});
			Ok(Suspension::Pending(activity_id))
		}
	}

	fn resolve_activity(&mut self, activity_id: &str) -> Result<Suspension, ActorCoreError> {
		let cursor = self.replay_pos as u64;
		match self.next_history() {
			Some(JournalEntry::ActivityCompleted { activity_id: recorded_id, result }) if recorded_id == activity_id =>
				Ok(Suspension::Completed(result.clone())),
			Some(JournalEntry::ActivityFailed { activity_id: recorded_id, error }) if recorded_id == activity_id =>
				Ok(Suspension::Failed(error.clone())),
			Some(other) =>
				Err(ActorCoreError::ReplayMismatch {
					cursor,
					detail: format!("expected completion for activity '{activity_id}', found {other:?}"),
				}),
			None => {
				// History ended exactly at the scheduled entry: the
				// activity is still outstanding.
				Ok(Suspension::Pending(activity_id.to_string()))
			},
		}
	}

	/// Same discipline as [`Self::call_activity`] but for external events.
	pub fn wait_for_event(&mut self, event_type: &str) -> Result<Suspension, ActorCoreError> {
		if self.mode == Mode::Replaying {
			let cursor = self.replay_pos as u64;
			match self.next_history() {
				Some(JournalEntry::Suspended { .. }) => {},
				Some(other) =>
					return Err(ActorCoreError::ReplayMismatch {
						cursor,
						detail: format!("expected suspended, found {other:?}"),
					}),
				None => unreachable!("next_history returned None while still Replaying"),
			}
			let resume_cursor = self.replay_pos as u64;
			match self.next_history() {
				Some(JournalEntry::EventReceived { event_type: recorded_type, data }) if recorded_type == event_type =>
					Ok(Suspension::Completed(data.clone())),
				Some(other) =>
					Err(ActorCoreError::ReplayMismatch {
						cursor: resume_cursor,
						detail: format!("expected event_received('{event_type}'), found {other:?}"),
					}),
				None => {
					// The wait hasn't been resolved yet; rewind the
					// `suspended` marker so a later activation resumes here.
					self.mode = Mode::Replaying;
					self.replay_pos -= 1;
					Ok(Suspension::Pending(event_type.to_string()))
				},
			}
		} else {
			self.appended.push(JournalEntry::Suspended { reason: format!("waiting for event '{event_type}'") });
			Ok(Suspension::Pending(event_type.to_string()))
		}
	}

	/// Appends a `child_spawned` entry; the runtime is responsible for
	/// actually dispatching the child actor.
	pub fn spawn_child(&mut self, actor_type: ActorType, input: Value) -> Result<ActorId, ActorCoreError> {
		if self.mode == Mode::Replaying {
			let cursor = self.replay_pos as u64;
			match self.next_history() {
				Some(JournalEntry::ChildSpawned { child_id, .. }) => Ok(child_id.clone()),
				Some(other) =>
					Err(ActorCoreError::ReplayMismatch {
						cursor,
						detail: format!("expected child_spawned, found {other:?}"),
					}),
				None => unreachable!("next_history returned None while still Replaying"),
			}
		} else {
			let child_id = new_quid("child");
			self.appended.push(JournalEntry::ChildSpawned { child_id: child_id.clone(), actor_type, input });
			Ok(child_id)
		}
	}

	/// Records an opaque, core-agnostic decision or gathered-context audit
	/// entry. Never replayed against; always appended.
	pub fn record_decision(&mut self, payload: Value) {
		self.appended.push(JournalEntry::DecisionMade { payload });
	}

	pub fn record_context(&mut self, payload: Value) {
		self.appended.push(JournalEntry::ContextGathered { payload });
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_fresh_update_state_appends_entry() {
		let mut ctx = ActorContext::new("a1".to_string(), json!({}), vec![]);
		ctx.update_state(|_| json!({"n": 1})).unwrap();
		assert_eq!(ctx.state(), &json!({"n": 1}));
		assert_eq!(ctx.into_appended().len(), 1);
	}

	#[test]
	fn test_replay_adopts_recorded_state_without_running_mutator() {
		let history = vec![JournalEntry::StateUpdated { state: json!({"n": 42}) }];
		let mut ctx = ActorContext::new("a1".to_string(), json!({}), history);
		ctx.update_state(|_| panic!("mutator must not run during replay")).unwrap();
		assert_eq!(ctx.state(), &json!({"n": 42}));
		assert!(ctx.is_caught_up());
	}

	#[test]
	fn test_fresh_call_activity_suspends_pending() {
		let mut ctx = ActorContext::new("a1".to_string(), json!({}), vec![]);
		let suspension = ctx.call_activity("fetch", json!({"url": "x"})).unwrap();
		assert!(suspension.is_pending());
		assert_eq!(ctx.into_appended().len(), 1);
	}

	#[test]
	fn test_replay_call_activity_returns_recorded_completion() {
		let history = vec![
			JournalEntry::ActivityScheduled {
				activity_id: "act-1".to_string(),
				name: "fetch".to_string(),
				input: json!({}),
			},
			JournalEntry::ActivityCompleted { activity_id: "act-1".to_string(), result: json!(42) },
		];
		let mut ctx = ActorContext::new("a1".to_string(), json!({}), history);
		let suspension = ctx.call_activity("fetch", json!({})).unwrap();
		match suspension {
			Suspension::Completed(value) => assert_eq!(value, json!(42)),
			other => panic!("expected Completed, got {other:?}"),
		}
		assert!(ctx.is_caught_up());
	}

	#[test]
	fn test_replay_stops_at_outstanding_activity() {
		let history = vec![JournalEntry::ActivityScheduled {
			activity_id: "act-1".to_string(),
			name: "fetch".to_string(),
			input: json!({}),
		}];
		let mut ctx = ActorContext::new("a1".to_string(), json!({}), history);
		let suspension = ctx.call_activity("fetch", json!({})).unwrap();
		assert!(suspension.is_pending());
	}

	#[test]
	fn test_mismatched_replay_entry_is_fatal() {
		let history = vec![JournalEntry::Suspended { reason: "x".to_string() }];
		let mut ctx = ActorContext::new("a1".to_string(), json!({}), history);
		let err = ctx.call_activity("fetch", json!({})).unwrap_err();
		assert!(matches!(err, ActorCoreError::ReplayMismatch { .. }));
	}
}
