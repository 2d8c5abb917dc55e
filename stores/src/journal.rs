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

use async_trait::async_trait;

use crate::{
	error::StoreError,
	model::{ActorId, JournalEntry, Snapshot},
};

/// Per-actor durable log plus latest snapshot.
///
/// Implementations must return independent, caller-owned copies from
/// `read_entries`: mutating the returned `Vec` must never retroactively
/// change what the store holds.
#[async_trait]
pub trait JournalStore: Send + Sync {
	/// Atomically appends `entry` to `actor_id`'s journal. Rejects an empty
	/// `actor_id`.
	async fn append_entry(&self, actor_id: &ActorId, entry: JournalEntry) -> Result<(), StoreError>;

	/// Returns every entry currently retained for `actor_id`, in append
	/// order.
	async fn read_entries(&self, actor_id: &ActorId) -> Result<Vec<JournalEntry>, StoreError>;

	/// Drops entries strictly preceding `before_cursor`. A no-op when
	/// `before_cursor == 0`; legal (and drops everything) when
	/// `before_cursor >= length`.
	async fn trim_entries(&self, actor_id: &ActorId, before_cursor: u64) -> Result<(), StoreError>;

	/// Atomically overwrites any existing snapshot for `actor_id`.
	async fn save_snapshot(&self, actor_id: &ActorId, snapshot: Snapshot) -> Result<(), StoreError>;

	/// Returns the latest snapshot for `actor_id`, if any. A snapshot whose
	/// serialized form is corrupt must be treated as absent rather than
	/// returned as an error, so callers fall back to full replay.
	async fn get_latest_snapshot(&self, actor_id: &ActorId) -> Result<Option<Snapshot>, StoreError>;

	/// Removes both the entries and the snapshot for `actor_id`.
	async fn delete_journal(&self, actor_id: &ActorId) -> Result<(), StoreError>;
}
