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

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use stores::ActorType;

use crate::{context::ActorContext, error::ActorCoreError};

/// User-defined work for a single durable actor type.
///
/// `execute` runs forward from wherever `ctx` has replayed to; it may call
/// `ctx.call_activity`/`ctx.wait_for_event`/`ctx.spawn_child` any number of
/// times. The contract asks that the same code path run on every
/// activation of a given invocation, so that replay — which feeds the same
/// journal entries back through the same calls — reaches the same state.
#[async_trait]
pub trait DurableActor: Send + Sync {
	/// Runs `input` forward. Returns the result of a completed
	/// invocation, or a suspension if it yielded at a `call_activity`/
	/// `wait_for_event`/`spawn_child` that has not resolved yet.
	async fn execute(&self, ctx: &mut ActorContext, input: Value) -> Result<ExecutionOutcome, ActorCoreError>;
}

/// What a single activation produced.
#[derive(Clone, Debug)]
pub enum ExecutionOutcome {
	Completed(Value),
	Failed(String),
	Suspended,
}

type Factory = Box<dyn Fn() -> Box<dyn DurableActor> + Send + Sync>;

/// Maps an `actorType` string to the factory that builds instances of it,
/// so the runtime can dispatch a message to the right behavior without
/// knowing concrete actor types at compile time.
#[derive(Default)]
pub struct ActorTypeRegistry {
	factories: HashMap<ActorType, Factory>,
}

impl ActorTypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<F>(&mut self, actor_type: impl Into<ActorType>, factory: F)
	where
		F: Fn() -> Box<dyn DurableActor> + Send + Sync + 'static,
	{
		self.factories.insert(actor_type.into(), Box::new(factory));
	}

	pub fn build(&self, actor_type: &str) -> Result<Box<dyn DurableActor>, ActorCoreError> {
		self.factories
			.get(actor_type)
			.map(|factory| factory())
			.ok_or_else(|| ActorCoreError::UnknownActorType(actor_type.to_string()))
	}

	pub fn contains(&self, actor_type: &str) -> bool {
		self.factories.contains_key(actor_type)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	struct Echo;

	#[async_trait]
	impl DurableActor for Echo {
		async fn execute(&self, ctx: &mut ActorContext, input: Value) -> Result<ExecutionOutcome, ActorCoreError> {
			ctx.update_state(|_| input.clone())?;
			Ok(ExecutionOutcome::Completed(input))
		}
	}

	#[test]
	fn test_unregistered_type_is_an_error() {
		let registry = ActorTypeRegistry::new();
		assert!(matches!(registry.build("echo"), Err(ActorCoreError::UnknownActorType(_))));
	}

	#[tokio::test]
	async fn test_registered_factory_builds_instances() {
		let mut registry = ActorTypeRegistry::new();
		registry.register("echo", || Box::new(Echo));
		let actor = registry.build("echo").unwrap();
		let mut ctx = ActorContext::new("a1".to_string(), json!(null), vec![]);
		let outcome = actor.execute(&mut ctx, json!({"hello": "world"})).await.unwrap();
		assert!(matches!(outcome, ExecutionOutcome::Completed(_)));
	}
}
