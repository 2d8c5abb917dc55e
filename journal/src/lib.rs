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

//! An in-memory, per-actor append-only journal plus latest snapshot.
//!
//! This is the reference implementation of `stores::JournalStore`: durable
//! only within the process, which is the intentional stand-in for the
//! concrete journal backend this core leaves out of scope.

use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
};

use async_trait::async_trait;
use stores::{ActorId, JournalEntry, JournalStore, Snapshot, StoreError};
use tracing::debug;

#[derive(Default)]
struct ActorJournal {
	/// How many entries have ever been trimmed away (the global index of
	/// `entries[0]`, if any, equals this value).
	trimmed_count: u64,
	entries: Vec<JournalEntry>,
	snapshot: Option<Snapshot>,
}

/// In-memory implementation of [`stores::JournalStore`].
#[derive(Clone, Default)]
pub struct MemoryJournalStore {
	journals: Arc<RwLock<HashMap<ActorId, ActorJournal>>>,
}

impl MemoryJournalStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
	async fn append_entry(&self, actor_id: &ActorId, entry: JournalEntry) -> Result<(), StoreError> {
		if actor_id.is_empty() {
			return Err(StoreError::InvalidArgument("actor_id must not be empty".to_string()));
		}
		let mut journals = self.journals.write().unwrap();
		journals.entry(actor_id.clone()).or_default().entries.push(entry);
		Ok(())
	}

	async fn read_entries(&self, actor_id: &ActorId) -> Result<Vec<JournalEntry>, StoreError> {
		let journals = self.journals.read().unwrap();
		Ok(journals.get(actor_id).map(|journal| journal.entries.clone()).unwrap_or_default())
	}

	async fn trim_entries(&self, actor_id: &ActorId, before_cursor: u64) -> Result<(), StoreError> {
		let mut journals = self.journals.write().unwrap();
		let Some(journal) = journals.get_mut(actor_id) else {
			return Ok(());
		};
		let total_len = journal.trimmed_count + journal.entries.len() as u64;
		let new_trimmed = before_cursor.min(total_len);
		if new_trimmed > journal.trimmed_count {
			let drop_n = (new_trimmed - journal.trimmed_count) as usize;
			journal.entries.drain(0..drop_n);
			journal.trimmed_count = new_trimmed;
			debug!(actor_id = %actor_id, dropped = drop_n, "trimmed journal entries");
		}
		Ok(())
	}

	async fn save_snapshot(&self, actor_id: &ActorId, snapshot: Snapshot) -> Result<(), StoreError> {
		let mut journals = self.journals.write().unwrap();
		journals.entry(actor_id.clone()).or_default().snapshot = Some(snapshot);
		Ok(())
	}

	async fn get_latest_snapshot(&self, actor_id: &ActorId) -> Result<Option<Snapshot>, StoreError> {
		let journals = self.journals.read().unwrap();
		Ok(journals.get(actor_id).and_then(|journal| journal.snapshot.clone()))
	}

	async fn delete_journal(&self, actor_id: &ActorId) -> Result<(), StoreError> {
		let mut journals = self.journals.write().unwrap();
		journals.remove(actor_id);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use stores::JournalEntry;

	use super::*;

	fn state_entry(n: i64) -> JournalEntry {
		JournalEntry::StateUpdated { state: json!({ "count": n }) }
	}

	#[tokio::test]
	async fn test_append_and_read_entries_preserve_order() {
		let store = MemoryJournalStore::new();
		let actor_id = "a1".to_string();
		for n in 0..3 {
			store.append_entry(&actor_id, state_entry(n)).await.unwrap();
		}
		let entries = store.read_entries(&actor_id).await.unwrap();
		assert_eq!(entries.len(), 3);
	}

	#[tokio::test]
	async fn test_append_entry_rejects_empty_actor_id() {
		let store = MemoryJournalStore::new();
		let result = store.append_entry(&String::new(), state_entry(0)).await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn test_trim_entries_is_noop_at_zero() {
		let store = MemoryJournalStore::new();
		let actor_id = "a1".to_string();
		store.append_entry(&actor_id, state_entry(0)).await.unwrap();
		store.trim_entries(&actor_id, 0).await.unwrap();
		assert_eq!(store.read_entries(&actor_id).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_trim_entries_drops_everything_past_length() {
		let store = MemoryJournalStore::new();
		let actor_id = "a1".to_string();
		for n in 0..5 {
			store.append_entry(&actor_id, state_entry(n)).await.unwrap();
		}
		store.trim_entries(&actor_id, 1000).await.unwrap();
		assert!(store.read_entries(&actor_id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_snapshot_trim_soundness() {
		let store = MemoryJournalStore::new();
		let actor_id = "a1".to_string();
		for n in 0..5 {
			store.append_entry(&actor_id, state_entry(n)).await.unwrap();
		}
		store
			.save_snapshot(&actor_id, Snapshot { state: json!({"count": 4}), cursor: 3, timestamp: 0 })
			.await
			.unwrap();
		store.trim_entries(&actor_id, 3).await.unwrap();
		let remaining = store.read_entries(&actor_id).await.unwrap();
		assert_eq!(remaining.len(), 2);
		let snapshot = store.get_latest_snapshot(&actor_id).await.unwrap().unwrap();
		assert_eq!(snapshot.cursor, 3);
	}

	#[tokio::test]
	async fn test_delete_journal_removes_entries_and_snapshot() {
		let store = MemoryJournalStore::new();
		let actor_id = "a1".to_string();
		store.append_entry(&actor_id, state_entry(0)).await.unwrap();
		store
			.save_snapshot(&actor_id, Snapshot { state: json!({"count": 0}), cursor: 1, timestamp: 0 })
			.await
			.unwrap();
		store.delete_journal(&actor_id).await.unwrap();
		assert!(store.read_entries(&actor_id).await.unwrap().is_empty());
		assert!(store.get_latest_snapshot(&actor_id).await.unwrap().is_none());
	}
}
