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

use async_trait::async_trait;

use crate::{error::StoreError, model::Lease};

/// Named, fenced, exclusive leases with TTL renewal and release.
///
/// Non-reentrant: a holder calling `acquire` again for a resource it
/// already holds gets a fresh lease only if its previous one expired.
/// Blocking behavior on contention is the caller's choice; this contract
/// is non-blocking (`acquire` returns `None` immediately on conflict).
#[async_trait]
pub trait LockStore: Send + Sync {
	/// Attempts to acquire `resource` for `ttl`. Returns `None` on
	/// contention with a still-live lease.
	async fn acquire(&self, resource: &str, holder: &str, ttl_ms: i64) -> Result<Option<Lease>, StoreError>;

	/// Extends `lease`'s expiry by `ttl_ms` from now, provided its fence
	/// token still matches the store's record (i.e. it has not been
	/// superseded by a newer holder). Returns `false` if the renewal was
	/// rejected.
	async fn renew(&self, lease: &Lease, ttl_ms: i64) -> Result<bool, StoreError>;

	/// Releases `lease`, provided its fence token is still current.
	async fn release(&self, lease: &Lease) -> Result<(), StoreError>;
}
