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

//! Named, fenced leases with TTL renewal: an in-memory reference
//! implementation of `stores::LockStore`, plus a `LockService` that holds a
//! lease alive by renewing it in the background at `ttl/3`, per the lease
//! contract ("TTL must exceed typical execution time; the runtime renews in
//! the background at ≤ TTL/3").

use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
	time::Duration,
};

use async_trait::async_trait;
use common::retry::{retry, Retry, RetryParams};
use stores::{Lease, LockStore, StoreError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

fn now_millis() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_millis() as i64
}

struct Record {
	fence_token: u64,
	held_by: String,
	expires_at: i64,
}

/// In-memory implementation of [`stores::LockStore`].
#[derive(Clone, Default)]
pub struct MemoryLockStore {
	leases: Arc<RwLock<HashMap<String, Record>>>,
}

impl MemoryLockStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl LockStore for MemoryLockStore {
	async fn acquire(&self, resource: &str, holder: &str, ttl_ms: i64) -> Result<Option<Lease>, StoreError> {
		let mut leases = self.leases.write().unwrap();
		let now = now_millis();
		if let Some(record) = leases.get(resource) {
			if record.expires_at > now {
				return Ok(None);
			}
		}
		let fence_token = leases.get(resource).map(|record| record.fence_token + 1).unwrap_or(1);
		let expires_at = now + ttl_ms;
		leases.insert(
			resource.to_string(),
			Record { fence_token, held_by: holder.to_string(), expires_at },
		);
		Ok(Some(Lease { resource: resource.to_string(), fence_token, held_by: holder.to_string(), expires_at }))
	}

	async fn renew(&self, lease: &Lease, ttl_ms: i64) -> Result<bool, StoreError> {
		let mut leases = self.leases.write().unwrap();
		let Some(record) = leases.get_mut(&lease.resource) else {
			return Ok(false);
		};
		if record.fence_token != lease.fence_token {
			return Ok(false);
		}
		record.expires_at = now_millis() + ttl_ms;
		Ok(true)
	}

	async fn release(&self, lease: &Lease) -> Result<(), StoreError> {
		let mut leases = self.leases.write().unwrap();
		if let Some(record) = leases.get(&lease.resource) {
			if record.fence_token == lease.fence_token {
				leases.remove(&lease.resource);
			}
		}
		Ok(())
	}
}

#[derive(Debug)]
struct RenewError;

/// Acquires and keeps leases alive on behalf of callers, renewing each one
/// in the background at `ttl/3` using the workspace's standard backoff
/// policy so a transient renewal failure does not immediately drop the
/// lease.
pub struct LockService {
	store: Arc<dyn LockStore>,
}

impl LockService {
	pub fn new(store: Arc<dyn LockStore>) -> Self {
		LockService { store }
	}

	/// Attempts to acquire `resource`, returning `None` on contention. On
	/// success, spawns a background task renewing the lease every
	/// `ttl_ms / 3` until the returned `ManagedLease` is dropped or
	/// explicitly released.
	pub async fn acquire(
		&self,
		resource: &str,
		holder: &str,
		ttl_ms: i64,
	) -> Result<Option<ManagedLease>, StoreError> {
		let Some(lease) = self.store.acquire(resource, holder, ttl_ms).await? else {
			return Ok(None);
		};
		Ok(Some(self.spawn_managed(lease, ttl_ms)))
	}

	fn spawn_managed(&self, lease: Lease, ttl_ms: i64) -> ManagedLease {
		let (stop_tx, mut stop_rx) = oneshot::channel();
		let store = self.store.clone();
		let renew_lease = lease.clone();
		let renew_period = Duration::from_millis((ttl_ms / 3).max(1) as u64);
		let retry_params = RetryParams { max_attempts: 3, ..RetryParams::default() };
		let renew_handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = &mut stop_rx => return,
					_ = tokio::time::sleep(renew_period) => {},
				}
				let store = store.clone();
				let lease_for_retry = renew_lease.clone();
				let renewed = retry(&retry_params, || {
					let store = store.clone();
					let lease_for_retry = lease_for_retry.clone();
					async move {
						store.renew(&lease_for_retry, ttl_ms).await.map_err(|_| Retry::Transient(RenewError))
					}
				})
				.await;
				match renewed {
					Ok(true) => debug!(resource = %renew_lease.resource, "lease renewed"),
					Ok(false) => {
						warn!(resource = %renew_lease.resource, "lease renewal rejected, lease lost");
						return;
					},
					Err(_) => {
						warn!(resource = %renew_lease.resource, "lease renewal failed after retries");
						return;
					},
				}
			}
		});
		ManagedLease { lease, store: self.store.clone(), stop_tx: Some(stop_tx), renew_handle: Some(renew_handle) }
	}
}

/// A lease kept alive by a background renewal task. Dropping it stops
/// renewal but does not release the lease (release is async); call
/// `release` explicitly to give it up before `expires_at`.
pub struct ManagedLease {
	lease: Lease,
	store: Arc<dyn LockStore>,
	stop_tx: Option<oneshot::Sender<()>>,
	renew_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ManagedLease {
	pub fn lease(&self) -> &Lease {
		&self.lease
	}

	/// Stops background renewal and releases the lease.
	pub async fn release(mut self) -> Result<(), StoreError> {
		if let Some(stop_tx) = self.stop_tx.take() {
			let _ = stop_tx.send(());
		}
		self.store.release(&self.lease).await
	}
}

impl Drop for ManagedLease {
	fn drop(&mut self) {
		if let Some(stop_tx) = self.stop_tx.take() {
			let _ = stop_tx.send(());
		}
		if let Some(handle) = self.renew_handle.take() {
			handle.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_acquire_is_exclusive() {
		let store = MemoryLockStore::new();
		let first = store.acquire("actor:1", "worker-a", 10_000).await.unwrap();
		assert!(first.is_some());
		let second = store.acquire("actor:1", "worker-b", 10_000).await.unwrap();
		assert!(second.is_none());
	}

	#[tokio::test]
	async fn test_acquire_after_release_succeeds() {
		let store = MemoryLockStore::new();
		let lease = store.acquire("actor:1", "worker-a", 10_000).await.unwrap().unwrap();
		store.release(&lease).await.unwrap();
		let second = store.acquire("actor:1", "worker-b", 10_000).await.unwrap();
		assert!(second.is_some());
	}

	#[tokio::test]
	async fn test_renew_rejects_superseded_lease() {
		let store = MemoryLockStore::new();
		let lease = store.acquire("actor:1", "worker-a", 1).await.unwrap().unwrap();
		tokio::time::sleep(Duration::from_millis(5)).await;
		let reacquired = store.acquire("actor:1", "worker-b", 10_000).await.unwrap().unwrap();
		assert_ne!(lease.fence_token, reacquired.fence_token);
		assert!(!store.renew(&lease, 10_000).await.unwrap());
	}

	#[tokio::test]
	async fn test_managed_lease_renews_in_background() {
		let store: Arc<dyn LockStore> = Arc::new(MemoryLockStore::new());
		let service = LockService::new(store.clone());
		let managed = service.acquire("actor:1", "worker-a", 30).await.unwrap().unwrap();
		tokio::time::sleep(Duration::from_millis(80)).await;
		// The renewal loop should have kept the lease alive well past its
		// original 30ms TTL.
		assert!(store.renew(managed.lease(), 30).await.unwrap());
		managed.release().await.unwrap();
	}
}
