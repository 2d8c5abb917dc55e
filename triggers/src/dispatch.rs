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
use serde_json::Value;

use crate::error::TriggerError;

/// The seam between an accepted trigger event and the actor runtime: turns
/// it into a message for `actor_type`. How that message reaches the queue
/// (a fresh `actorId`, routing, priority) is a decision the concrete
/// implementation makes; this crate only knows it needs to happen.
#[async_trait]
pub trait TriggerDispatch: Send + Sync {
	async fn dispatch(&self, actor_type: &str, payload: Value) -> Result<(), TriggerError>;
}
