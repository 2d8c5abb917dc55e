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

use common::error::{ServiceError, ServiceErrorCode};
use stores::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
	#[error("path expression '{0}' could not be parsed")]
	InvalidPath(String),

	#[error("unresolved reference in expression: {0}")]
	UnresolvedReference(String),

	#[error("unknown stage '{0}' referenced")]
	UnknownStage(String),

	#[error("stage '{0}' is not a scatter stage; gather.stage must reference one")]
	NotAScatterStage(String),

	#[error("gather on stage '{stage}' timed out after {timeout_ms}ms with {completed}/{total} tasks complete")]
	GatherTimeout { stage: String, timeout_ms: u64, completed: usize, total: usize },

	#[error("stage '{0}' failed")]
	StageFailed(String),

	#[error("pipeline was cancelled")]
	Cancelled,

	#[error(transparent)]
	Store(#[from] StoreError),
}

impl ServiceError for PipelineError {
	fn error_code(&self) -> ServiceErrorCode {
		match self {
			PipelineError::InvalidPath(_) | PipelineError::UnresolvedReference(_) | PipelineError::UnknownStage(_) =>
				ServiceErrorCode::BadRequest,
			PipelineError::NotAScatterStage(_) => ServiceErrorCode::BadRequest,
			PipelineError::GatherTimeout { .. } => ServiceErrorCode::Timeout,
			PipelineError::StageFailed(_) => ServiceErrorCode::Internal,
			PipelineError::Cancelled => ServiceErrorCode::Conflict,
			PipelineError::Store(err) => err.error_code(),
		}
	}
}
