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

use crate::{error::StoreError, model::OutboxRecord};

/// The transactional outbox a pipeline stage's completion is written into
/// alongside its state update, so publication to the coordination channel
/// is exactly-once even across a crash between the write and the publish.
#[async_trait]
pub trait OutboxStore: Send + Sync {
	/// Writes `record` in the `Pending` state. Callers are expected to
	/// perform this in the same logical write as the stage task's state
	/// mutation (a single conditional write in a backend that supports
	/// one; this trait only expresses the outbox half of that contract).
	async fn put(&self, record: OutboxRecord) -> Result<(), StoreError>;

	/// Returns pending records for `pipeline_id`, oldest first, for a
	/// relay to drain.
	async fn take_pending(&self, pipeline_id: &str, limit: usize) -> Result<Vec<OutboxRecord>, StoreError>;

	/// Deletes a record once it has been published to the coordination
	/// channel. Deleting an unknown id is a no-op.
	async fn delete(&self, outbox_id: &str) -> Result<(), StoreError>;
}
