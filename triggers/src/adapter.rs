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

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
	error::TriggerError,
	model::{RawEvent, VerificationOutcome},
};

/// Receives raw events an adapter notices (a webhook call landing, a poll
/// turning up a new item, ...). The manager is the only implementer in this
/// crate, but the seam is its own trait so an adapter doesn't need to know
/// about `TriggerManager` to call back into it.
#[async_trait]
pub trait TriggerSink: Send + Sync {
	async fn on_trigger(&self, adapter_name: &str, event: RawEvent);
}

/// A source of external events bound to the runtime: `start`/`stop` its
/// underlying transport, `verify` a specific event's authenticity, and
/// `onTrigger` (here, whatever calls [`TriggerSink::on_trigger`]) deliver
/// one once noticed.
#[async_trait]
pub trait TriggerAdapter: Send + Sync {
	fn name(&self) -> &str;

	/// Begins listening; accepted events are handed to `sink.on_trigger`.
	async fn start(&self, sink: Arc<dyn TriggerSink>) -> Result<(), TriggerError>;

	async fn stop(&self) -> Result<(), TriggerError>;

	/// Checks one event's authenticity (signature, bearer token, ...)
	/// without regard to whether verification is actually required for
	/// this adapter's bound trigger — that decision belongs to the caller.
	async fn verify(&self, event: &RawEvent) -> VerificationOutcome;
}
