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

//! The lifecycle of a single message-processing slice. The runtime drives
//! an actor through these states once per activation; terminal states
//! release the lease and acknowledge (or dead-letter) the message.

/// `Idle -> Replaying -> Executing -> (Suspended <-> ResumingOnDelivery)* ->
/// Completed | Failed`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JournaledActorState {
	/// Not yet activated for this message.
	Idle,
	/// Consuming journal entries recorded before this activation.
	Replaying,
	/// Running user code past the point replay caught up to.
	Executing,
	/// Waiting on an activity, event, or child result that has not
	/// resolved; the lease may be released while in this state.
	Suspended,
	/// A resolving delivery (`resume_with_activity`/`resume`) has arrived
	/// and is being folded back into the actor before execution resumes.
	ResumingOnDelivery,
	/// The invocation produced a final result.
	Completed,
	/// The invocation raised an error unrelated to any in-flight activity.
	Failed,
}

impl JournaledActorState {
	pub fn is_terminal(self) -> bool {
		matches!(self, JournaledActorState::Completed | JournaledActorState::Failed)
	}

	pub fn is_suspended(self) -> bool {
		matches!(self, JournaledActorState::Suspended)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_terminal_states() {
		assert!(JournaledActorState::Completed.is_terminal());
		assert!(JournaledActorState::Failed.is_terminal());
		assert!(!JournaledActorState::Suspended.is_terminal());
	}
}
