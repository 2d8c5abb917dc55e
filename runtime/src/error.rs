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

use actor_core::ActorCoreError;
use common::error::{ServiceError, ServiceErrorCode};
use stores::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
	/// Another worker currently holds `actor:<actorId>`'s lease; the
	/// message should be retried.
	#[error("lease for actor '{0}' is held by another worker")]
	LeaseConflict(String),
	/// `resume_with_activity`/`resume` was called for an actor with no
	/// outstanding invocation to resume.
	#[error("actor '{0}' has no in-flight invocation to resume")]
	NothingToResume(String),
	#[error(transparent)]
	Core(#[from] ActorCoreError),
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl ServiceError for RuntimeError {
	fn error_code(&self) -> ServiceErrorCode {
		match self {
			RuntimeError::LeaseConflict(_) => ServiceErrorCode::Conflict,
			RuntimeError::NothingToResume(_) => ServiceErrorCode::BadRequest,
			RuntimeError::Core(err) => err.error_code(),
			RuntimeError::Store(err) => err.error_code(),
		}
	}
}
