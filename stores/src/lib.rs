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

//! Shared data model and abstract store contracts for the durable actor
//! runtime: KV state, blob, journal, queue, lock and shared-memory
//! interfaces. Every type here is a plain contract; concrete backends live
//! in their own crates (`journal`, `lock-service`, `mqueue`, `sharedmem`)
//! or are out of scope entirely (KV, blob).

pub mod error;
pub mod kv;
pub mod lock;
pub mod model;
pub mod outbox;
pub mod queue;
pub mod sharedmem;

pub mod journal;

pub use error::StoreError;
pub use journal::JournalStore;
pub use kv::{BlobStore, KvStore};
pub use lock::LockStore;
pub use model::{
	ActivityId, ActorId, ActorType, JournalEntry, Lease, Message, MessageId, MessageMetadata,
	OutboxRecord, OutboxState, Snapshot, StageState, StageTask,
};
pub use outbox::OutboxStore;
pub use queue::QueueStore;
pub use sharedmem::SharedMemoryStore;
