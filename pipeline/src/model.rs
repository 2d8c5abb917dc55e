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

//! The stage DAG model a pipeline definition is built from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a stage dispatches its work.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
	Single,
	Scatter,
	Gather,
}

/// The barrier condition a gather stage waits on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatherCondition {
	All,
	Any,
	N(usize),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScatterSpec {
	/// Path evaluated against the context to produce the array iterated over.
	pub input: String,
	/// The variable name each element is bound to while `input` is
	/// re-evaluated per task (referenced via `@variables('as')`).
	#[serde(rename = "as")]
	pub as_: String,
	pub max_parallel: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatherSpec {
	/// The upstream scatter stage this gather collects from.
	pub stage: String,
	pub condition: GatherCondition,
	pub group_by: Option<String>,
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
	pub max_parallel: Option<usize>,
	pub timeout_ms: Option<u64>,
	pub min_results: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stage {
	pub name: String,
	pub mode: StageMode,
	pub actor_type: String,
	/// Template evaluated against the context (and, for scatter, the
	/// per-element binding) to build the message sent to `actor_type`.
	pub input: Value,
	pub scatter: Option<ScatterSpec>,
	pub gather: Option<GatherSpec>,
	#[serde(default)]
	pub executor_config: ExecutorConfig,
}

/// An ordered list of stages forming a DAG; edges are implicit in
/// `gather.stage` references and evaluation order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineDefinition {
	pub pipeline_id: String,
	pub stages: Vec<Stage>,
	#[serde(default)]
	pub parameters: HashMap<String, Value>,
}

impl PipelineDefinition {
	pub fn stage(&self, name: &str) -> Option<&Stage> {
		self.stages.iter().find(|stage| stage.name == name)
	}
}

/// The pipeline's context object: `{ trigger, stages: { name -> result } }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineContext {
	pub trigger: Value,
	pub stages: HashMap<String, Value>,
}

impl PipelineContext {
	pub fn new(trigger: Value) -> Self {
		PipelineContext { trigger, stages: HashMap::new() }
	}

	/// The `$`-rooted value path expressions in stage inputs evaluate
	/// against: `{ trigger, stages }`.
	pub fn as_value(&self) -> Value {
		serde_json::json!({ "trigger": self.trigger, "stages": self.stages })
	}
}
