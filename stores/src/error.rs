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

use common::{ServiceError, ServiceErrorCode};
use thiserror::Error;

/// Errors surfaced by any of the store contracts in this crate.
///
/// These mirror the "Transient I/O", "Conflict" and "DataCorruption" error
/// kinds described for the runtime built on top of these stores; concrete
/// backends should map their own failures onto this set rather than leaking
/// backend-specific error types across the trait boundary.
#[derive(Error, Debug)]
pub enum StoreError {
	#[error("entry for `{0}` not found")]
	NotFound(String),

	#[error("`{0}` already exists")]
	AlreadyExists(String),

	#[error("conflicting write to `{0}`: held by a different lease")]
	Conflict(String),

	#[error("stored record for `{0}` is corrupted: {1}")]
	DataCorruption(String, String),

	#[error("transient I/O error: {0}")]
	Transient(#[from] anyhow::Error),

	#[error("invalid argument: {0}")]
	InvalidArgument(String),
}

impl ServiceError for StoreError {
	fn error_code(&self) -> ServiceErrorCode {
		match self {
			StoreError::NotFound(_) => ServiceErrorCode::NotFound,
			StoreError::AlreadyExists(_) => ServiceErrorCode::AlreadyExists,
			StoreError::Conflict(_) => ServiceErrorCode::Conflict,
			StoreError::DataCorruption(..) => ServiceErrorCode::Internal,
			StoreError::Transient(_) => ServiceErrorCode::Unavailable,
			StoreError::InvalidArgument(_) => ServiceErrorCode::BadRequest,
		}
	}
}
