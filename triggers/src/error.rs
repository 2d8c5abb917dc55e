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
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
	#[error("no trigger adapter registered under '{0}'")]
	UnknownAdapter(String),
	#[error("no binding configured for trigger '{0}'")]
	UnboundTrigger(String),
	#[error("event from '{0}' rejected: {1}")]
	VerificationFailed(String, String),
	#[error("failed to dispatch accepted event to actor type '{0}': {1}")]
	DispatchFailed(String, String),
}

impl ServiceError for TriggerError {
	fn error_code(&self) -> ServiceErrorCode {
		match self {
			TriggerError::UnknownAdapter(_) | TriggerError::UnboundTrigger(_) => ServiceErrorCode::NotFound,
			TriggerError::VerificationFailed(..) => ServiceErrorCode::BadRequest,
			TriggerError::DispatchFailed(..) => ServiceErrorCode::Internal,
		}
	}
}
