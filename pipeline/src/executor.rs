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

//! Drives a [`PipelineDefinition`] to completion, one stage at a time, in
//! list order. Every task completion (single stage, one scatter element, or
//! one gather group) is written to the transactional outbox and relayed
//! into the running context before the next stage evaluates its input, so a
//! later stage's `$.stages.x` reference always sees a committed value.

use std::{collections::HashMap, sync::Arc, time::Duration};

use common::quid::new_quid;
use serde_json::{json, Value};
use stores::{OutboxRecord, OutboxState, OutboxStore, SharedMemoryStore, StageState, StageTask};
use tokio::sync::{Mutex, Semaphore};

use crate::{
	cancellation,
	dispatch::StageDispatcher,
	error::PipelineError,
	model::{GatherCondition, PipelineContext, PipelineDefinition, Stage, StageMode},
	path::{render_template, EvalContext, NoSecrets, PathExpr, SecretResolver},
	relay::{IdempotentSink, OutboxRelay, StageCompletionSink},
};

#[derive(Clone, Debug)]
enum TaskOutcome {
	Completed(Value),
	Failed(String),
}

/// What one run produced: the final context plus the terminal state every
/// stage reached (only `completed`/`failed`/`cancelled` are possible at the
/// end of a run; `running`/`waiting` are only observable mid-flight).
#[derive(Clone, Debug, Default)]
pub struct PipelineRunResult {
	pub context: PipelineContext,
	pub stage_states: HashMap<String, StageState>,
}

pub struct PipelineRunner {
	dispatcher: Arc<dyn StageDispatcher>,
	outbox: Arc<dyn OutboxStore>,
	secrets: Arc<dyn SecretResolver>,
	shared_memory: Option<Arc<dyn SharedMemoryStore>>,
}

impl PipelineRunner {
	pub fn new(dispatcher: Arc<dyn StageDispatcher>, outbox: Arc<dyn OutboxStore>) -> Self {
		PipelineRunner { dispatcher, outbox, secrets: Arc::new(NoSecrets), shared_memory: None }
	}

	pub fn with_secrets(mut self, secrets: Arc<dyn SecretResolver>) -> Self {
		self.secrets = secrets;
		self
	}

	/// Wires in the coordination surface `cancel_pipeline` and every
	/// in-flight dispatch consult to decide whether a pipeline has been
	/// externally cancelled. Without this, `cancel_pipeline` is a no-op and
	/// no stage ever observes cancellation.
	pub fn with_shared_memory(mut self, shared_memory: Arc<dyn SharedMemoryStore>) -> Self {
		self.shared_memory = Some(shared_memory);
		self
	}

	/// Marks `pipeline_id` cancelled: every stage not yet terminal becomes
	/// `cancelled`, and already-issued task completions still in flight are
	/// soft-ignored rather than applied, per the cancellation contract. A
	/// no-op if this runner has no shared memory store configured.
	pub async fn cancel_pipeline(&self, pipeline_id: &str) -> Result<(), PipelineError> {
		match &self.shared_memory {
			Some(store) => Ok(cancellation::request_cancellation(store.as_ref(), pipeline_id).await?),
			None => Ok(()),
		}
	}

	async fn is_cancelled(&self, pipeline_id: &str) -> Result<bool, PipelineError> {
		match &self.shared_memory {
			Some(store) => Ok(cancellation::is_cancelled(store.as_ref(), pipeline_id).await?),
			None => Ok(false),
		}
	}

	pub async fn run(&self, definition: &PipelineDefinition, trigger: Value) -> Result<PipelineRunResult, PipelineError> {
		let mut context = PipelineContext::new(trigger);
		let mut stage_states: HashMap<String, StageState> = HashMap::new();
		let mut scatter_tasks: HashMap<String, Vec<StageTask>> = HashMap::new();
		let mut cancelled = false;

		for stage in &definition.stages {
			if cancelled {
				stage_states.insert(stage.name.clone(), StageState::Cancelled);
				continue;
			}
			if self.is_cancelled(&definition.pipeline_id).await? {
				cancelled = true;
				stage_states.insert(stage.name.clone(), StageState::Cancelled);
				continue;
			}
			let state = match stage.mode {
				StageMode::Single => self.run_single(stage, definition, &mut context).await,
				StageMode::Scatter => self.run_scatter(stage, definition, &mut context, &mut scatter_tasks).await,
				StageMode::Gather => self.run_gather(stage, definition, &mut context, &scatter_tasks).await,
			};
			let state = match state {
				Ok(state) => state,
				Err(PipelineError::Cancelled) => StageState::Cancelled,
				Err(_) => StageState::Failed,
			};
			if matches!(state, StageState::Failed | StageState::Cancelled) {
				cancelled = true;
			}
			stage_states.insert(stage.name.clone(), state);
		}

		Ok(PipelineRunResult { context, stage_states })
	}

	fn eval_context<'a>(&'a self, root: &'a Value, variables: &'a HashMap<String, Value>, parameters: &'a HashMap<String, Value>) -> EvalContext<'a> {
		EvalContext { root, variables, parameters, secrets: self.secrets.as_ref() }
	}

	async fn dispatch_task(
		&self,
		pipeline_id: &str,
		stage_name: &str,
		actor_type: &str,
		task_id: &str,
		input: Value,
		timeout_ms: Option<u64>,
	) -> Result<TaskOutcome, PipelineError> {
		if self.is_cancelled(pipeline_id).await? {
			return Err(PipelineError::Cancelled);
		}
		let dispatcher = self.dispatcher.clone();
		let actor_type_owned = actor_type.to_string();
		let call = dispatcher.dispatch(&actor_type_owned, input);
		let outcome = match timeout_ms {
			Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), call).await {
				Ok(result) => result_to_outcome(result),
				Err(_) => TaskOutcome::Failed("task timed out".to_string()),
			},
			None => result_to_outcome(call.await),
		};
		// The task may have been in flight when cancellation was requested;
		// its completion is soft-ignored rather than published.
		if self.is_cancelled(pipeline_id).await? {
			return Err(PipelineError::Cancelled);
		}
		self.publish(pipeline_id, stage_name, task_id, &outcome).await?;
		Ok(outcome)
	}

	async fn publish(&self, pipeline_id: &str, stage_name: &str, task_id: &str, outcome: &TaskOutcome) -> Result<(), PipelineError> {
		let payload = match outcome {
			TaskOutcome::Completed(result) => json!({"status": "completed", "result": result}),
			TaskOutcome::Failed(error) => json!({"status": "failed", "error": error}),
		};
		let record = OutboxRecord {
			outbox_id: new_quid("outbox"),
			pipeline_id: pipeline_id.to_string(),
			stage_name: stage_name.to_string(),
			task_id: task_id.to_string(),
			payload,
			state: OutboxState::Pending,
		};
		self.outbox.put(record).await?;
		let relay = OutboxRelay::new(self.outbox.clone());
		let sink = IdempotentSink::new(NoopSink);
		relay.drain(pipeline_id, &sink, 1).await?;
		Ok(())
	}

	async fn run_single(&self, stage: &Stage, definition: &PipelineDefinition, context: &mut PipelineContext) -> Result<StageState, PipelineError> {
		let root = context.as_value();
		let variables = HashMap::new();
		let eval_ctx = self.eval_context(&root, &variables, &definition.parameters);
		let input = render_template(&stage.input, &eval_ctx)?;
		let task_id = new_quid("task");
		let outcome = self
			.dispatch_task(&definition.pipeline_id, &stage.name, &stage.actor_type, &task_id, input, stage.executor_config.timeout_ms)
			.await?;
		match outcome {
			TaskOutcome::Completed(result) => {
				context.stages.insert(stage.name.clone(), result);
				Ok(StageState::Completed)
			},
			TaskOutcome::Failed(_) => Ok(StageState::Failed),
		}
	}

	async fn run_scatter(
		&self,
		stage: &Stage,
		definition: &PipelineDefinition,
		context: &mut PipelineContext,
		scatter_tasks: &mut HashMap<String, Vec<StageTask>>,
	) -> Result<StageState, PipelineError> {
		let scatter_spec =
			stage.scatter.as_ref().ok_or_else(|| PipelineError::InvalidPath(format!("stage '{}' is missing a scatter spec", stage.name)))?;
		let root = context.as_value();
		let empty_variables = HashMap::new();
		let items_value = {
			let eval_ctx = self.eval_context(&root, &empty_variables, &definition.parameters);
			PathExpr::parse(&scatter_spec.input)?.evaluate(&eval_ctx)?
		};
		let items = match items_value {
			Value::Array(items) => items,
			Value::Null => Vec::new(),
			other => vec![other],
		};

		if items.is_empty() {
			context.stages.insert(stage.name.clone(), json!([]));
			scatter_tasks.insert(stage.name.clone(), Vec::new());
			return Ok(StageState::Completed);
		}

		let mut rendered = Vec::with_capacity(items.len());
		for item in &items {
			let mut variables = HashMap::new();
			variables.insert(scatter_spec.as_.clone(), item.clone());
			let eval_ctx = self.eval_context(&root, &variables, &definition.parameters);
			rendered.push(render_template(&stage.input, &eval_ctx)?);
		}

		let permits = stage.executor_config.max_parallel.or(scatter_spec.max_parallel).unwrap_or(items.len()).max(1);
		let semaphore = Arc::new(Semaphore::new(permits));
		let outcomes: Arc<Mutex<Vec<Option<TaskOutcome>>>> = Arc::new(Mutex::new(vec![None; rendered.len()]));
		let task_ids: Vec<String> = (0..rendered.len()).map(|_| new_quid("task")).collect();

		let mut handles = Vec::with_capacity(rendered.len());
		for (index, input) in rendered.into_iter().enumerate() {
			let semaphore = semaphore.clone();
			let outcomes = outcomes.clone();
			let pipeline_id = definition.pipeline_id.clone();
			let stage_name = stage.name.clone();
			let actor_type = stage.actor_type.clone();
			let task_id = task_ids[index].clone();
			let timeout_ms = stage.executor_config.timeout_ms;
			let dispatcher = self.dispatcher.clone();
			let outbox = self.outbox.clone();
			let shared_memory = self.shared_memory.clone();
			handles.push(tokio::spawn(async move {
				let _permit = semaphore.acquire_owned().await.expect("scatter semaphore closed");
				let call = dispatcher.dispatch(&actor_type, input);
				let outcome = match timeout_ms {
					Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), call).await {
						Ok(result) => result_to_outcome(result),
						Err(_) => TaskOutcome::Failed("task timed out".to_string()),
					},
					None => result_to_outcome(call.await),
				};
				// This task's dispatch may have completed after the pipeline
				// was cancelled; soft-ignore it rather than publish.
				let soft_ignored = match &shared_memory {
					Some(store) => cancellation::is_cancelled(store.as_ref(), &pipeline_id).await.unwrap_or(false),
					None => false,
				};
				if soft_ignored {
					return;
				}
				let payload = match &outcome {
					TaskOutcome::Completed(result) => json!({"status": "completed", "result": result}),
					TaskOutcome::Failed(error) => json!({"status": "failed", "error": error}),
				};
				let record = OutboxRecord {
					outbox_id: new_quid("outbox"),
					pipeline_id,
					stage_name,
					task_id: task_id.clone(),
					payload,
					state: OutboxState::Pending,
				};
				let _ = outbox.put(record).await;
				outcomes.lock().await[index] = Some(outcome);
			}));
		}
		for handle in handles {
			let _ = handle.await;
		}
		let relay = OutboxRelay::new(self.outbox.clone());
		let sink = IdempotentSink::new(NoopSink);
		relay.drain(&definition.pipeline_id, &sink, task_ids.len()).await?;

		if self.is_cancelled(&definition.pipeline_id).await? {
			scatter_tasks.insert(stage.name.clone(), Vec::new());
			return Err(PipelineError::Cancelled);
		}

		let resolved = outcomes.lock().await;
		let mut tasks = Vec::with_capacity(resolved.len());
		let mut results = Vec::with_capacity(resolved.len());
		let mut completed_count = 0usize;
		for (index, outcome) in resolved.iter().enumerate() {
			let outcome = outcome.clone().unwrap_or_else(|| TaskOutcome::Failed("task never completed".to_string()));
			let (status, result, value) = match outcome {
				TaskOutcome::Completed(value) => {
					completed_count += 1;
					(StageState::Completed, Some(value.clone()), value)
				},
				TaskOutcome::Failed(_) => (StageState::Failed, None, Value::Null),
			};
			tasks.push(StageTask {
				task_id: task_ids[index].clone(),
				stage_name: stage.name.clone(),
				pipeline_id: definition.pipeline_id.clone(),
				input: Value::Null,
				status,
				result,
			});
			results.push(value);
		}
		context.stages.insert(stage.name.clone(), Value::Array(results));
		scatter_tasks.insert(stage.name.clone(), tasks);

		let required = stage.executor_config.min_results.unwrap_or(resolved.len());
		if completed_count >= required {
			Ok(StageState::Completed)
		} else {
			Ok(StageState::Failed)
		}
	}

	async fn run_gather(
		&self,
		stage: &Stage,
		definition: &PipelineDefinition,
		context: &mut PipelineContext,
		scatter_tasks: &HashMap<String, Vec<StageTask>>,
	) -> Result<StageState, PipelineError> {
		let gather_spec = stage.gather.as_ref().ok_or_else(|| PipelineError::InvalidPath(format!("stage '{}' is missing a gather spec", stage.name)))?;
		let tasks = scatter_tasks.get(&gather_spec.stage).ok_or_else(|| PipelineError::UnknownStage(gather_spec.stage.clone()))?;

		if tasks.is_empty() {
			context.stages.insert(stage.name.clone(), json!([]));
			return Ok(StageState::Completed);
		}

		let completed: Vec<&StageTask> = tasks.iter().filter(|task| task.status == StageState::Completed).collect();
		let satisfied = match &gather_spec.condition {
			GatherCondition::All => {
				let required = stage.executor_config.min_results.unwrap_or(tasks.len());
				completed.len() >= required
			},
			GatherCondition::Any => !completed.is_empty(),
			GatherCondition::N(n) => completed.len() >= *n,
		};
		if !satisfied {
			return Ok(StageState::Failed);
		}

		let selected: Vec<&StageTask> = match &gather_spec.condition {
			GatherCondition::Any => completed.into_iter().take(1).collect(),
			GatherCondition::N(n) => completed.into_iter().take(*n).collect(),
			GatherCondition::All => completed,
		};

		if let Some(group_by) = &gather_spec.group_by {
			let path = crate::path::JsonPath::parse(group_by)?;
			let mut order: Vec<String> = Vec::new();
			let mut groups: HashMap<String, Vec<Value>> = HashMap::new();
			for task in &selected {
				let Some(result) = &task.result else { continue };
				let key_value = path.evaluate(result);
				let key = value_as_key(&key_value);
				if !groups.contains_key(&key) {
					order.push(key.clone());
				}
				groups.entry(key).or_default().push(result.clone());
			}
			let mut group_results = Vec::with_capacity(order.len());
			for key in &order {
				let items = groups.remove(key).unwrap_or_default();
				let input = json!({"group": {"key": key, "items": items}});
				let task_id = new_quid("task");
				let outcome =
					self.dispatch_task(&definition.pipeline_id, &stage.name, &stage.actor_type, &task_id, input, gather_spec.timeout_ms).await?;
				match outcome {
					TaskOutcome::Completed(result) => group_results.push(result),
					TaskOutcome::Failed(error) => return Err(PipelineError::StageFailed(format!("{}: {error}", stage.name))),
				}
			}
			context.stages.insert(stage.name.clone(), Value::Array(group_results));
		} else {
			let results: Vec<Value> = selected.iter().filter_map(|task| task.result.clone()).collect();
			context.stages.insert(stage.name.clone(), Value::Array(results));
		}

		Ok(StageState::Completed)
	}
}

struct NoopSink;

#[async_trait::async_trait]
impl StageCompletionSink for NoopSink {
	async fn apply(&self, _record: &OutboxRecord) {}
}

fn result_to_outcome(result: Result<Value, PipelineError>) -> TaskOutcome {
	match result {
		Ok(value) => TaskOutcome::Completed(value),
		Err(error) => TaskOutcome::Failed(error.to_string()),
	}
}

fn value_as_key(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
