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

//! Composes actor invocations into single/scatter/gather stage DAGs on top
//! of the durable actor runtime, with a transactional outbox carrying each
//! task's completion to the running pipeline context exactly once.

mod cancellation;
mod dispatch;
mod error;
mod executor;
mod model;
mod outbox_store;
mod path;
mod relay;

pub use dispatch::StageDispatcher;
pub use error::PipelineError;
pub use executor::{PipelineRunResult, PipelineRunner};
pub use model::{ExecutorConfig, GatherCondition, GatherSpec, PipelineContext, PipelineDefinition, ScatterSpec, Stage, StageMode};
pub use outbox_store::MemoryOutboxStore;
pub use path::{render_template, EvalContext, JsonPath, NoSecrets, PathExpr, SecretResolver};
pub use relay::{IdempotentSink, OutboxRelay, StageCompletionSink};

#[cfg(test)]
mod tests {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	};

	use async_trait::async_trait;
	use serde_json::{json, Value};
	use stores::{OutboxStore, StageState};

	use super::*;

	struct Echo;

	#[async_trait]
	impl StageDispatcher for Echo {
		async fn dispatch(&self, actor_type: &str, input: Value) -> Result<Value, PipelineError> {
			Ok(json!({"actor": actor_type, "echoed": input}))
		}
	}

	struct DoubleNumber;

	#[async_trait]
	impl StageDispatcher for DoubleNumber {
		async fn dispatch(&self, _actor_type: &str, input: Value) -> Result<Value, PipelineError> {
			let n = input.get("n").and_then(Value::as_i64).unwrap_or(0);
			Ok(json!({"doubled": n * 2}))
		}
	}

	struct FailsOnInput(i64);

	#[async_trait]
	impl StageDispatcher for FailsOnInput {
		async fn dispatch(&self, _actor_type: &str, input: Value) -> Result<Value, PipelineError> {
			let n = input.get("n").and_then(Value::as_i64).unwrap_or(0);
			if n == self.0 {
				Err(PipelineError::StageFailed(format!("n == {n}")))
			} else {
				Ok(json!({"n": n}))
			}
		}
	}

	struct CountingDispatcher {
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl StageDispatcher for CountingDispatcher {
		async fn dispatch(&self, _actor_type: &str, input: Value) -> Result<Value, PipelineError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(input)
		}
	}

	fn single_stage(name: &str, actor_type: &str, input: Value) -> Stage {
		Stage {
			name: name.to_string(),
			mode: StageMode::Single,
			actor_type: actor_type.to_string(),
			input,
			scatter: None,
			gather: None,
			executor_config: ExecutorConfig::default(),
		}
	}

	#[tokio::test]
	async fn single_stage_renders_input_and_records_result() {
		let runner = PipelineRunner::new(Arc::new(Echo), Arc::new(MemoryOutboxStore::new()));
		let definition = PipelineDefinition {
			pipeline_id: "p1".to_string(),
			stages: vec![single_stage("greet", "greeter", json!({"name": "$.trigger.name"}))],
			parameters: Default::default(),
		};
		let result = runner.run(&definition, json!({"name": "ada"})).await.unwrap();
		assert_eq!(result.stage_states["greet"], StageState::Completed);
		assert_eq!(result.context.stages["greet"]["echoed"], json!({"name": "ada"}));
	}

	#[tokio::test]
	async fn failed_stage_cancels_downstream_stages() {
		let runner = PipelineRunner::new(Arc::new(FailsOnInput(1)), Arc::new(MemoryOutboxStore::new()));
		let definition = PipelineDefinition {
			pipeline_id: "p1".to_string(),
			stages: vec![single_stage("a", "worker", json!({"n": 1})), single_stage("b", "worker", json!({"n": 2}))],
			parameters: Default::default(),
		};
		let result = runner.run(&definition, json!({})).await.unwrap();
		assert_eq!(result.stage_states["a"], StageState::Failed);
		assert_eq!(result.stage_states["b"], StageState::Cancelled);
		assert!(!result.context.stages.contains_key("b"));
	}

	#[tokio::test]
	async fn empty_scatter_completes_immediately_with_empty_array() {
		let runner = PipelineRunner::new(Arc::new(Echo), Arc::new(MemoryOutboxStore::new()));
		let scatter = Stage {
			name: "fanout".to_string(),
			mode: StageMode::Scatter,
			actor_type: "worker".to_string(),
			input: json!({"item": "@variables('item')"}),
			scatter: Some(ScatterSpec { input: "$.trigger.items".to_string(), as_: "item".to_string(), max_parallel: None }),
			gather: None,
			executor_config: ExecutorConfig::default(),
		};
		let definition = PipelineDefinition { pipeline_id: "p1".to_string(), stages: vec![scatter], parameters: Default::default() };
		let result = runner.run(&definition, json!({"items": []})).await.unwrap();
		assert_eq!(result.stage_states["fanout"], StageState::Completed);
		assert_eq!(result.context.stages["fanout"], json!([]));
	}

	#[tokio::test]
	async fn scatter_preserves_source_order() {
		let runner = PipelineRunner::new(Arc::new(DoubleNumber), Arc::new(MemoryOutboxStore::new()));
		let scatter = Stage {
			name: "double_all".to_string(),
			mode: StageMode::Scatter,
			actor_type: "doubler".to_string(),
			input: json!({"n": "@variables('item')"}),
			scatter: Some(ScatterSpec { input: "$.trigger.numbers".to_string(), as_: "item".to_string(), max_parallel: Some(4) }),
			gather: None,
			executor_config: ExecutorConfig::default(),
		};
		let definition = PipelineDefinition { pipeline_id: "p1".to_string(), stages: vec![scatter], parameters: Default::default() };
		let result = runner.run(&definition, json!({"numbers": [1, 2, 3]})).await.unwrap();
		let doubled: Vec<Value> = result.context.stages["double_all"].as_array().unwrap().iter().map(|v| v["doubled"].clone()).collect();
		assert_eq!(doubled, vec![json!(2), json!(4), json!(6)]);
	}

	#[tokio::test]
	async fn gather_all_with_min_results_tolerates_some_failures() {
		let runner = PipelineRunner::new(Arc::new(FailsOnInput(2)), Arc::new(MemoryOutboxStore::new()));
		let scatter = Stage {
			name: "fanout".to_string(),
			mode: StageMode::Scatter,
			actor_type: "worker".to_string(),
			input: json!({"n": "@variables('item')"}),
			scatter: Some(ScatterSpec { input: "$.trigger.numbers".to_string(), as_: "item".to_string(), max_parallel: None }),
			gather: None,
			executor_config: ExecutorConfig { min_results: Some(2), ..Default::default() },
		};
		let definition = PipelineDefinition { pipeline_id: "p1".to_string(), stages: vec![scatter], parameters: Default::default() };
		// one of three tasks (n == 2) fails; min_results: 2 should still let the stage succeed.
		let result = runner.run(&definition, json!({"numbers": [1, 2, 3]})).await.unwrap();
		assert_eq!(result.stage_states["fanout"], StageState::Completed);
	}

	#[tokio::test]
	async fn gather_group_by_invokes_once_per_distinct_key() {
		let calls = Arc::new(AtomicUsize::new(0));
		let runner = PipelineRunner::new(Arc::new(CountingDispatcher { calls: calls.clone() }), Arc::new(MemoryOutboxStore::new()));
		let scatter = Stage {
			name: "fanout".to_string(),
			mode: StageMode::Scatter,
			actor_type: "worker".to_string(),
			input: json!({"category": "@variables('item').category", "n": "@variables('item').n"}),
			scatter: Some(ScatterSpec { input: "$.trigger.items".to_string(), as_: "item".to_string(), max_parallel: None }),
			gather: None,
			executor_config: ExecutorConfig::default(),
		};
		// ScatterSpec.input references whole objects; build each task's input by
		// hand instead of a path into the bound element's fields, since the
		// minilanguage binds `@variables('item')` to the whole element.
		let scatter = Stage { input: json!("@variables('item')"), ..scatter };
		let gather = Stage {
			name: "by_category".to_string(),
			mode: StageMode::Gather,
			actor_type: "summarizer".to_string(),
			input: Value::Null,
			scatter: None,
			gather: Some(GatherSpec {
				stage: "fanout".to_string(),
				condition: GatherCondition::All,
				group_by: Some("$.category".to_string()),
				timeout_ms: None,
			}),
			executor_config: ExecutorConfig::default(),
		};
		let definition =
			PipelineDefinition { pipeline_id: "p1".to_string(), stages: vec![scatter, gather], parameters: Default::default() };
		let trigger = json!({"items": [
			{"category": "a", "n": 1},
			{"category": "b", "n": 2},
			{"category": "a", "n": 3},
		]});
		let result = runner.run(&definition, trigger).await.unwrap();
		assert_eq!(result.stage_states["by_category"], StageState::Completed);
		let groups = result.context.stages["by_category"].as_array().unwrap();
		assert_eq!(groups.len(), 2);
		// one call per scattered element, plus one per distinct group.
		assert_eq!(calls.load(Ordering::SeqCst), 3 + 2);
	}

	#[tokio::test]
	async fn cancelling_before_run_marks_every_stage_cancelled() {
		let store = Arc::new(sharedmem::MemorySharedMemoryStore::new());
		let runner = PipelineRunner::new(Arc::new(Echo), Arc::new(MemoryOutboxStore::new())).with_shared_memory(store);
		let definition = PipelineDefinition {
			pipeline_id: "p1".to_string(),
			stages: vec![single_stage("a", "worker", json!({})), single_stage("b", "worker", json!({}))],
			parameters: Default::default(),
		};
		runner.cancel_pipeline("p1").await.unwrap();
		let result = runner.run(&definition, json!({})).await.unwrap();
		assert_eq!(result.stage_states["a"], StageState::Cancelled);
		assert_eq!(result.stage_states["b"], StageState::Cancelled);
	}

	struct CancelsOnFirstCall {
		store: Arc<sharedmem::MemorySharedMemoryStore>,
		pipeline_id: String,
		called: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl StageDispatcher for CancelsOnFirstCall {
		async fn dispatch(&self, _actor_type: &str, input: Value) -> Result<Value, PipelineError> {
			if self.called.fetch_add(1, Ordering::SeqCst) == 0 {
				cancellation::request_cancellation(self.store.as_ref(), &self.pipeline_id).await.unwrap();
			}
			Ok(json!({"echoed": input}))
		}
	}

	#[tokio::test]
	async fn cancellation_requested_mid_scatter_soft_ignores_in_flight_tasks() {
		let store = Arc::new(sharedmem::MemorySharedMemoryStore::new());
		let outbox = Arc::new(MemoryOutboxStore::new());
		let dispatcher =
			Arc::new(CancelsOnFirstCall { store: store.clone(), pipeline_id: "p1".to_string(), called: Arc::new(AtomicUsize::new(0)) });
		let runner = PipelineRunner::new(dispatcher, outbox.clone()).with_shared_memory(store.clone());
		let scatter = Stage {
			name: "fanout".to_string(),
			mode: StageMode::Scatter,
			actor_type: "worker".to_string(),
			input: json!({"n": "@variables('item')"}),
			scatter: Some(ScatterSpec { input: "$.trigger.numbers".to_string(), as_: "item".to_string(), max_parallel: Some(1) }),
			gather: None,
			executor_config: ExecutorConfig::default(),
		};
		let definition = PipelineDefinition { pipeline_id: "p1".to_string(), stages: vec![scatter], parameters: Default::default() };
		let result = runner.run(&definition, json!({"numbers": [1, 2, 3]})).await.unwrap();
		assert_eq!(result.stage_states["fanout"], StageState::Cancelled);
		let pending = outbox.take_pending("p1", 10).await.unwrap();
		assert!(pending.len() < 3, "cancelled tasks must not be published to the outbox");
	}
}
