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

use std::sync::{
	atomic::{AtomicU32, Ordering},
	Arc,
};

/// A protected zone is a period of time during which an actor is
/// known to be at work, but cannot be making progress through the
/// regular "one message at a time" loop.
///
/// Entering a protected zone increments a counter, leaving it decrements
/// the same counter. An actor is considered alive as long as the progress
/// flag was observed as changed, or there is an open protected zone.
#[derive(Clone, Default)]
pub struct Progress {
	value: Arc<AtomicU32>,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) struct ProgressState {
	num_protected_zones: u32,
	has_changed: bool,
}

const NO_PROTECTED_ZONES_CHANGED_FLAG: u32 = 1;

impl Progress {
	pub fn record_progress(&self) {
		self.value.fetch_or(NO_PROTECTED_ZONES_CHANGED_FLAG, Ordering::Relaxed);
	}

	pub fn protect_zone(&self) -> ProtectedZoneGuard {
		self.value.fetch_add(1 << 1, Ordering::SeqCst);
		ProtectedZoneGuard { progress: self.clone() }
	}

	/// Returns the progress state and resets the `has_changed` flag
	/// for the next observation period.
	pub(crate) fn registered_activity_since_last_call(&self) -> bool {
		let previous_value = self.value.fetch_and(!NO_PROTECTED_ZONES_CHANGED_FLAG, Ordering::SeqCst);
		let state = decode_state(previous_value);
		state.num_protected_zones > 0 || state.has_changed
	}
}

fn decode_state(value: u32) -> ProgressState {
	ProgressState {
		num_protected_zones: value >> 1,
		has_changed: (value & NO_PROTECTED_ZONES_CHANGED_FLAG) != 0,
	}
}

/// While this object is alive, the actor holding it is "protected".
///
/// A protected actor can take more than `HEARTBEAT` to answer, without being
/// identified as blocked/dead by its supervisor.
pub struct ProtectedZoneGuard {
	progress: Progress,
}

impl Drop for ProtectedZoneGuard {
	fn drop(&mut self) {
		self.progress.value.fetch_sub(1 << 1, Ordering::SeqCst);
		self.progress.record_progress();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_progress_starts_with_activity() {
		let progress = Progress::default();
		assert!(progress.registered_activity_since_last_call());
		assert!(!progress.registered_activity_since_last_call());
	}

	#[test]
	fn test_progress_protect_zone() {
		let progress = Progress::default();
		assert!(progress.registered_activity_since_last_call());
		let guard = progress.protect_zone();
		assert!(progress.registered_activity_since_last_call());
		assert!(progress.registered_activity_since_last_call());
		drop(guard);
		assert!(progress.registered_activity_since_last_call());
		assert!(!progress.registered_activity_since_last_call());
	}
}
