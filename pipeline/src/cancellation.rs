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

//! A pipeline's cancellation flag: a single boolean written to shared
//! memory under a key derived from `pipelineId`. Actors observing an
//! in-flight task soft-ignore it once this flag is set, per the
//! cancellation contract: a running stage doesn't get torn down, its
//! completion is just no longer acted on.

use serde_json::{json, Value};
use stores::{SharedMemoryStore, StoreError};

fn key(pipeline_id: &str) -> String {
	format!("pipeline:{pipeline_id}:cancelled")
}

pub async fn request_cancellation(store: &dyn SharedMemoryStore, pipeline_id: &str) -> Result<(), StoreError> {
	store.set(&key(pipeline_id), json!(true), None).await
}

pub async fn is_cancelled(store: &dyn SharedMemoryStore, pipeline_id: &str) -> Result<bool, StoreError> {
	let flag = store.get(&key(pipeline_id)).await?;
	Ok(matches!(flag, Some(Value::Bool(true))))
}

#[cfg(test)]
mod tests {
	use sharedmem::MemorySharedMemoryStore;

	use super::*;

	#[tokio::test]
	async fn unset_flag_reads_as_not_cancelled() {
		let store = MemorySharedMemoryStore::new();
		assert!(!is_cancelled(&store, "p1").await.unwrap());
	}

	#[tokio::test]
	async fn request_cancellation_is_observed_for_that_pipeline_only() {
		let store = MemorySharedMemoryStore::new();
		request_cancellation(&store, "p1").await.unwrap();
		assert!(is_cancelled(&store, "p1").await.unwrap());
		assert!(!is_cancelled(&store, "p2").await.unwrap());
	}
}
