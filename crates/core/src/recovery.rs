//! Mapping from a failed action to the client's reaction.
//!
//! [`RecoveryPolicy::decide`] is total: every [`Failure`] yields exactly one
//! [`RecoveryAction`]. Applying the action (sleeping, re-issuing, notifying)
//! is the controller's job; the policy never performs I/O.

use std::time::Duration;

use pu_protocol::{ActionKind, Failure, SelfHealing};
use serde::Serialize;

/// Delay before re-issuing an action the server reports as recovered.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Which remediation list a surfaced failure carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemedyKind {
	Suggestions,
	AlternativeMethods,
}

/// What the client does about a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
	/// The server already fixed the problem. Re-issue the action after `delay`.
	SilentRetry { delay: Duration },
	/// Show the failure along with concrete things the operator can try.
	SurfaceWithRemedy {
		message: String,
		remedy_kind: RemedyKind,
		remedy_items: Vec<String>,
	},
	/// Show the failure as is.
	SurfacePlain { message: String },
}

impl RecoveryAction {
	pub fn is_silent_retry(&self) -> bool {
		matches!(self, RecoveryAction::SilentRetry { .. })
	}
}

/// Deterministic failure classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
	retry_delay: Duration,
}

impl Default for RecoveryPolicy {
	fn default() -> Self {
		Self::new(DEFAULT_RETRY_DELAY)
	}
}

impl RecoveryPolicy {
	pub fn new(retry_delay: Duration) -> Self {
		Self { retry_delay }
	}

	pub fn retry_delay(&self) -> Duration {
		self.retry_delay
	}

	/// Classifies `failure` raised by `action`.
	///
	/// Both remedy lists are consulted for every action. When both are
	/// non-empty the list native to the action wins: suggestions for
	/// detection, alternative methods for unlock.
	pub fn decide(&self, failure: &Failure, action: ActionKind) -> RecoveryAction {
		let Some(healing) = &failure.self_healing else {
			return plain(failure);
		};

		if healing.is_recovered() {
			return RecoveryAction::SilentRetry { delay: self.retry_delay };
		}

		let order = match action {
			ActionKind::Detection => [RemedyKind::Suggestions, RemedyKind::AlternativeMethods],
			ActionKind::Unlock => [RemedyKind::AlternativeMethods, RemedyKind::Suggestions],
		};

		order
			.into_iter()
			.find_map(|kind| {
				let items = remedy_list(healing, kind);
				(!items.is_empty()).then(|| RecoveryAction::SurfaceWithRemedy {
					message: failure.message.clone(),
					remedy_kind: kind,
					remedy_items: items.to_vec(),
				})
			})
			.unwrap_or_else(|| plain(failure))
	}
}

fn remedy_list(healing: &SelfHealing, kind: RemedyKind) -> &[String] {
	match kind {
		RemedyKind::Suggestions => healing.suggestions(),
		RemedyKind::AlternativeMethods => healing.alternative_methods(),
	}
}

fn plain(failure: &Failure) -> RecoveryAction {
	RecoveryAction::SurfacePlain {
		message: failure.message.clone(),
	}
}
