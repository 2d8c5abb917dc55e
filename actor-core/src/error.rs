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
pub enum ActorCoreError {
	/// The journal disagreed with what the current execution attempted to
	/// record (e.g. a replayed entry's discriminator didn't match the
	/// operation replaying it). This is the "corrupt entry is fatal"
	/// lifecycle error.
	#[error("journal entry at cursor {cursor} is inconsistent with replay: {detail}")]
	ReplayMismatch { cursor: u64, detail: String },
	/// No factory is registered for the requested actor type.
	#[error("no actor type registered for '{0}'")]
	UnknownActorType(String),
	/// Propagated from the underlying journal store.
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl ServiceError for ActorCoreError {
	fn error_code(&self) -> ServiceErrorCode {
		match self {
			ActorCoreError::ReplayMismatch { .. } => ServiceErrorCode::Internal,
			ActorCoreError::UnknownActorType(_) => ServiceErrorCode::NotFound,
			ActorCoreError::Store(err) => err.error_code(),
		}
	}
}
