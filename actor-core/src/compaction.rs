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

use serde_json::Value;
use stores::{JournalStore, Snapshot, StoreError};
use tracing::debug;

/// Governs how often `compact_journal` runs. The lease held during an
/// activation makes concurrent compactions on the same actor impossible,
/// so this is purely a local counter, not a distributed one.
#[derive(Clone, Copy, Debug)]
pub struct CompactionConfig {
	pub every_n_entries: u64,
}

impl Default for CompactionConfig {
	fn default() -> Self {
		CompactionConfig { every_n_entries: 100 }
	}
}

/// Writes a snapshot at `cursor` and trims everything before it, if at
/// least `config.every_n_entries` have accumulated since the last
/// compaction. Idempotent: running it twice in a row with the same
/// `cursor` is a no-op the second time because `trim_entries` is a no-op
/// once nothing precedes the cursor.
pub async fn compact_journal(
	store: &dyn JournalStore,
	actor_id: &str,
	state: &Value,
	cursor: u64,
	entries_since_last_compaction: u64,
	config: &CompactionConfig,
) -> Result<bool, StoreError> {
	if entries_since_last_compaction < config.every_n_entries {
		return Ok(false);
	}
	let timestamp = now_millis();
	store.save_snapshot(actor_id, Snapshot { state: state.clone(), cursor, timestamp }).await?;
	store.trim_entries(actor_id, cursor).await?;
	debug!(actor_id, cursor, "compacted journal");
	Ok(true)
}

fn now_millis() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_millis() as i64
}

#[cfg(test)]
mod tests {
	use journal::MemoryJournalStore;
	use serde_json::json;

	use super::*;

	#[tokio::test]
	async fn test_below_threshold_does_not_compact() {
		let store = MemoryJournalStore::new();
		let compacted = compact_journal(&store, "a1", &json!({}), 10, 5, &CompactionConfig { every_n_entries: 100 })
			.await
			.unwrap();
		assert!(!compacted);
		assert!(store.get_latest_snapshot("a1").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_at_threshold_writes_snapshot_and_trims() {
		let store = MemoryJournalStore::new();
		for i in 0..10u64 {
			store.append_entry("a1", stores::JournalEntry::StateUpdated { state: json!(i) }).await.unwrap();
		}
		let compacted = compact_journal(&store, "a1", &json!(9), 10, 10, &CompactionConfig { every_n_entries: 10 })
			.await
			.unwrap();
		assert!(compacted);
		let snapshot = store.get_latest_snapshot("a1").await.unwrap().unwrap();
		assert_eq!(snapshot.cursor, 10);
		assert_eq!(store.read_entries("a1").await.unwrap().len(), 0);
	}
}
