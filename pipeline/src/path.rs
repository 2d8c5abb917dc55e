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

//! A small hand-rolled evaluator for the path minilanguage stage inputs are
//! written against: `$.a.b`, array indexing `[n]`, wildcard `[*]`, and the
//! `@variables('x')` / `@parameters('y')` / `@secret('key')` reference
//! forms. No parser-combinator or JSONPath crate is pulled in for this; the
//! grammar is small and fixed enough that plain `str` slicing reads more
//! plainly than a dependency would.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::PipelineError;

/// Resolves `@secret('key')` references. Left abstract since concrete
/// secret backends are out of scope; a pipeline that never references a
/// secret never calls this.
pub trait SecretResolver: Send + Sync {
	fn resolve(&self, key: &str) -> Option<String>;
}

/// A resolver that never has a secret, for pipelines that don't use them.
#[derive(Default)]
pub struct NoSecrets;

impl SecretResolver for NoSecrets {
	fn resolve(&self, _key: &str) -> Option<String> {
		None
	}
}

/// Everything a path expression is evaluated against.
pub struct EvalContext<'a> {
	pub root: &'a Value,
	pub variables: &'a HashMap<String, Value>,
	pub parameters: &'a HashMap<String, Value>,
	pub secrets: &'a dyn SecretResolver,
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
	Field(String),
	Index(usize),
	Wildcard,
}

/// A parsed `$.a.b[0][*]`-style selector, evaluated against `root`.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonPath {
	segments: Vec<Segment>,
	has_wildcard: bool,
}

impl JsonPath {
	pub fn parse(expr: &str) -> Result<JsonPath, PipelineError> {
		let rest = expr.strip_prefix('$').ok_or_else(|| PipelineError::InvalidPath(expr.to_string()))?;
		let mut segments = Vec::new();
		let mut chars = rest.chars().peekable();
		while let Some(&c) = chars.peek() {
			match c {
				'.' => {
					chars.next();
					let name: String = consume_while(&mut chars, |c| c != '.' && c != '[');
					if name.is_empty() {
						return Err(PipelineError::InvalidPath(expr.to_string()));
					}
					segments.push(Segment::Field(name));
				},
				'[' => {
					chars.next();
					let inner: String = consume_while(&mut chars, |c| c != ']');
					match chars.next() {
						Some(']') => {},
						_ => return Err(PipelineError::InvalidPath(expr.to_string())),
					}
					if inner == "*" {
						segments.push(Segment::Wildcard);
					} else {
						let index = inner.parse::<usize>().map_err(|_| PipelineError::InvalidPath(expr.to_string()))?;
						segments.push(Segment::Index(index));
					}
				},
				_ => return Err(PipelineError::InvalidPath(expr.to_string())),
			}
		}
		let has_wildcard = segments.iter().any(|s| matches!(s, Segment::Wildcard));
		Ok(JsonPath { segments, has_wildcard })
	}

	pub fn evaluate(&self, root: &Value) -> Value {
		let mut current = vec![root.clone()];
		for segment in &self.segments {
			let mut next = Vec::new();
			for value in &current {
				match segment {
					Segment::Field(name) =>
						if let Some(found) = value.get(name) {
							next.push(found.clone());
						},
					Segment::Index(index) =>
						if let Some(found) = value.get(index) {
							next.push(found.clone());
						},
					Segment::Wildcard =>
						if let Some(items) = value.as_array() {
							next.extend(items.iter().cloned());
						},
				}
			}
			current = next;
		}
		match current.len() {
			0 => Value::Null,
			1 if !self.has_wildcard => current.into_iter().next().expect("len checked"),
			_ => Value::Array(current),
		}
	}
}

fn consume_while(chars: &mut std::iter::Peekable<std::str::Chars>, pred: impl Fn(char) -> bool) -> String {
	let mut out = String::new();
	while let Some(&c) = chars.peek() {
		if !pred(c) {
			break;
		}
		out.push(c);
		chars.next();
	}
	out
}

/// One of the four expression forms a stage input may reference.
#[derive(Clone, Debug, PartialEq)]
pub enum PathExpr {
	Json(JsonPath),
	Variable(String),
	Parameter(String),
	Secret(String),
}

impl PathExpr {
	pub fn parse(expr: &str) -> Result<PathExpr, PipelineError> {
		if let Some(name) = parse_call(expr, "@variables(") {
			return Ok(PathExpr::Variable(name));
		}
		if let Some(name) = parse_call(expr, "@parameters(") {
			return Ok(PathExpr::Parameter(name));
		}
		if let Some(name) = parse_call(expr, "@secret(") {
			return Ok(PathExpr::Secret(name));
		}
		if expr.starts_with('$') {
			return Ok(PathExpr::Json(JsonPath::parse(expr)?));
		}
		Err(PipelineError::InvalidPath(expr.to_string()))
	}

	pub fn evaluate(&self, ctx: &EvalContext) -> Result<Value, PipelineError> {
		match self {
			PathExpr::Json(path) => Ok(path.evaluate(ctx.root)),
			PathExpr::Variable(name) =>
				ctx.variables.get(name).cloned().ok_or_else(|| PipelineError::UnresolvedReference(format!("variables('{name}')"))),
			PathExpr::Parameter(name) =>
				ctx.parameters.get(name).cloned().ok_or_else(|| PipelineError::UnresolvedReference(format!("parameters('{name}')"))),
			PathExpr::Secret(name) => ctx
				.secrets
				.resolve(name)
				.map(Value::String)
				.ok_or_else(|| PipelineError::UnresolvedReference(format!("secret('{name}')"))),
		}
	}
}

/// `prefix` is e.g. `"@variables("`; expects a single-quoted argument and a
/// closing paren, e.g. `@variables('x')`.
fn parse_call(expr: &str, prefix: &str) -> Option<String> {
	let inner = expr.strip_prefix(prefix)?.strip_suffix(')')?;
	let inner = inner.strip_prefix('\'')?.strip_suffix('\'')?;
	Some(inner.to_string())
}

fn looks_like_path_expr(s: &str) -> bool {
	s.starts_with('$') || s.starts_with("@variables(") || s.starts_with("@parameters(") || s.starts_with("@secret(")
}

/// Recursively resolves every string leaf of `template` that looks like a
/// path expression, leaving other values untouched. This is how a stage's
/// `input` template is turned into a concrete message payload.
pub fn render_template(template: &Value, ctx: &EvalContext) -> Result<Value, PipelineError> {
	match template {
		Value::String(s) if looks_like_path_expr(s) => PathExpr::parse(s)?.evaluate(ctx),
		Value::Object(map) => {
			let mut out = serde_json::Map::with_capacity(map.len());
			for (key, value) in map {
				out.insert(key.clone(), render_template(value, ctx)?);
			}
			Ok(Value::Object(out))
		},
		Value::Array(items) => {
			let mut out = Vec::with_capacity(items.len());
			for item in items {
				out.push(render_template(item, ctx)?);
			}
			Ok(Value::Array(out))
		},
		other => Ok(other.clone()),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn ctx<'a>(
		root: &'a Value,
		variables: &'a HashMap<String, Value>,
		parameters: &'a HashMap<String, Value>,
		secrets: &'a dyn SecretResolver,
	) -> EvalContext<'a> {
		EvalContext { root, variables, parameters, secrets }
	}

	#[test]
	fn field_and_index_access() {
		let root = json!({"trigger": {"items": [10, 20, 30]}});
		let path = JsonPath::parse("$.trigger.items[1]").unwrap();
		assert_eq!(path.evaluate(&root), json!(20));
	}

	#[test]
	fn wildcard_collects_array() {
		let root = json!({"stages": {"fetch": [{"id": 1}, {"id": 2}]}});
		let path = JsonPath::parse("$.stages.fetch[*].id").unwrap();
		assert_eq!(path.evaluate(&root), json!([1, 2]));
	}

	#[test]
	fn missing_field_evaluates_to_null() {
		let root = json!({"a": 1});
		let path = JsonPath::parse("$.b.c").unwrap();
		assert_eq!(path.evaluate(&root), Value::Null);
	}

	#[test]
	fn variable_reference_resolves_from_context() {
		let root = json!({});
		let mut variables = HashMap::new();
		variables.insert("doc".to_string(), json!("report.pdf"));
		let parameters = HashMap::new();
		let secrets = NoSecrets;
		let context = ctx(&root, &variables, &parameters, &secrets);
		let value = PathExpr::parse("@variables('doc')").unwrap().evaluate(&context).unwrap();
		assert_eq!(value, json!("report.pdf"));
	}

	#[test]
	fn unresolved_secret_is_an_error() {
		let root = json!({});
		let variables = HashMap::new();
		let parameters = HashMap::new();
		let secrets = NoSecrets;
		let context = ctx(&root, &variables, &parameters, &secrets);
		let err = PathExpr::parse("@secret('api_key')").unwrap().evaluate(&context).unwrap_err();
		assert!(matches!(err, PipelineError::UnresolvedReference(_)));
	}

	#[test]
	fn render_template_walks_nested_structures() {
		let root = json!({"trigger": {"url": "https://example.com"}});
		let variables = HashMap::new();
		let parameters = HashMap::new();
		let secrets = NoSecrets;
		let context = ctx(&root, &variables, &parameters, &secrets);
		let template = json!({"target": "$.trigger.url", "retries": 3});
		let rendered = render_template(&template, &context).unwrap();
		assert_eq!(rendered, json!({"target": "https://example.com", "retries": 3}));
	}

	#[test]
	fn invalid_path_is_rejected() {
		assert!(JsonPath::parse("trigger.a").is_err());
		assert!(JsonPath::parse("$.a[").is_err());
	}
}
