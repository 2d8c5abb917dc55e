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

//! Bounded tracking of which actors are presently "active". Eviction here
//! is transparent: an evicted actor's state lives on in the journal store,
//! so the next message for it simply rehydrates via a fresh replay.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

const DEFAULT_MAX_POOL_SIZE: usize = 100;

pub struct ActorPool {
	active: LruCache<String, ()>,
}

impl ActorPool {
	pub fn new(max_pool_size: usize) -> Self {
		let capacity = NonZeroUsize::new(max_pool_size).unwrap_or(NonZeroUsize::new(DEFAULT_MAX_POOL_SIZE).unwrap());
		ActorPool { active: LruCache::new(capacity) }
	}

	/// Marks `actor_id` as just used, evicting the least-recently-used
	/// entry if the pool is at capacity.
	pub fn touch(&mut self, actor_id: &str) {
		if let Some((evicted, _)) = self.active.push(actor_id.to_string(), ()) {
			if evicted != actor_id {
				debug!(actor_id = %evicted, "evicted actor from the active pool");
			}
		}
	}

	pub fn len(&self) -> usize {
		self.active.len()
	}

	pub fn is_empty(&self) -> bool {
		self.active.is_empty()
	}
}

impl Default for ActorPool {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_POOL_SIZE)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_evicts_least_recently_used() {
		let mut pool = ActorPool::new(2);
		pool.touch("a1");
		pool.touch("a2");
		pool.touch("a1"); // a1 is now most-recently-used
		pool.touch("a3"); // evicts a2, not a1
		assert_eq!(pool.len(), 2);
	}
}
