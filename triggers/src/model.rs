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

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

/// A raw inbound event, as an adapter first sees it: an opaque payload plus
/// whatever headers/attributes the transport carried (used by verification
/// to find a signature or bearer token).
#[derive(Clone, Debug)]
pub struct RawEvent {
	pub payload: Value,
	pub metadata: HashMap<String, String>,
}

impl RawEvent {
	pub fn new(payload: Value) -> Self {
		RawEvent { payload, metadata: HashMap::new() }
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}
}

/// What an adapter's `verify` returned for one event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationOutcome {
	pub valid: bool,
	pub reason: Option<String>,
}

impl VerificationOutcome {
	pub fn accept() -> Self {
		VerificationOutcome { valid: true, reason: None }
	}

	pub fn reject(reason: impl Into<String>) -> Self {
		VerificationOutcome { valid: false, reason: Some(reason.into()) }
	}
}

/// How one adapter's accepted events become a message for the runtime.
#[derive(Clone)]
pub struct TriggerBinding {
	pub actor_type: String,
	pub requires_verification: bool,
	pub filter: Option<Arc<dyn Fn(&RawEvent) -> bool + Send + Sync>>,
	pub transform: Option<Arc<dyn Fn(RawEvent) -> Value + Send + Sync>>,
}

impl TriggerBinding {
	pub fn new(actor_type: impl Into<String>) -> Self {
		TriggerBinding { actor_type: actor_type.into(), requires_verification: false, filter: None, transform: None }
	}

	pub fn require_verification(mut self) -> Self {
		self.requires_verification = true;
		self
	}

	pub fn with_filter(mut self, filter: impl Fn(&RawEvent) -> bool + Send + Sync + 'static) -> Self {
		self.filter = Some(Arc::new(filter));
		self
	}

	pub fn with_transform(mut self, transform: impl Fn(RawEvent) -> Value + Send + Sync + 'static) -> Self {
		self.transform = Some(Arc::new(transform));
		self
	}
}
