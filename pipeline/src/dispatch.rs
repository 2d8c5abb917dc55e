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

//! The seam between a pipeline's stage execution and the actor runtime that
//! actually carries it out. A stage task is "one message to `actorType`,
//! awaited to completion" from the orchestrator's point of view; how that
//! message travels the queue, how many activations it takes, and how its
//! completion reaches the outbox are the concern of `mqueue`/`runtime`, not
//! this crate.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PipelineError;

#[async_trait]
pub trait StageDispatcher: Send + Sync {
	async fn dispatch(&self, actor_type: &str, input: Value) -> Result<Value, PipelineError>;
}
