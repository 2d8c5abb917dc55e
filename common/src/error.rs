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

use std::convert::Infallible;

/// A restricted, transport-agnostic classification of failures shared by
/// every store, queue, and lock implementation in the workspace.
///
/// Earlier incarnations of this type mapped directly onto gRPC/HTTP status
/// codes. Since this crate no longer exposes a network API, the codes are
/// kept purely so that retry policies and callers can reason about failure
/// classes without downcasting to a concrete error type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServiceErrorCode {
	AlreadyExists,
	BadRequest,
	Conflict,
	Internal,
	NotFound,
	RateLimited,
	Timeout,
	Unavailable,
}

pub trait ServiceError: ToString {
	fn error_code(&self) -> ServiceErrorCode;
}

impl ServiceError for Infallible {
	fn error_code(&self) -> ServiceErrorCode {
		unreachable!()
	}
}
