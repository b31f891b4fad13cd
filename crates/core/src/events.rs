//! Notifications published by the session controller.

use std::fmt;
use std::time::Duration;

use pu_protocol::{ActionKind, DetectionReport, DeviceId, Failure, ProgressEvent, SystemStatus, UnlockPlan};
use pu_runtime::ChannelState;
use serde::Serialize;

use crate::recovery::{RecoveryAction, RemedyKind};

/// How long a notice should stay in front of the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// Informational; the server already handled it.
	Transient,
	/// Needs the operator's attention.
	Persistent,
}

/// Concrete things the operator can try after a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remedy {
	pub kind: RemedyKind,
	pub items: Vec<String>,
}

/// A surfaced action failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNotice {
	pub action: ActionKind,
	pub message: String,
	pub severity: Severity,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub remedy: Option<Remedy>,
}

impl FailureNotice {
	/// Builds the notice for `failure` given the policy's decision.
	///
	/// A silent retry that is surfaced anyway (unlock never retries) becomes a
	/// transient notice.
	pub fn new(action: ActionKind, failure: &Failure, decision: &RecoveryAction) -> Self {
		match decision {
			RecoveryAction::SilentRetry { .. } => Self {
				action,
				message: failure.message.clone(),
				severity: Severity::Transient,
				remedy: None,
			},
			RecoveryAction::SurfaceWithRemedy {
				message,
				remedy_kind,
				remedy_items,
			} => Self {
				action,
				message: message.clone(),
				severity: Severity::Persistent,
				remedy: Some(Remedy {
					kind: *remedy_kind,
					items: remedy_items.clone(),
				}),
			},
			RecoveryAction::SurfacePlain { message } => Self::plain(action, message.clone()),
		}
	}

	pub fn plain(action: ActionKind, message: impl Into<String>) -> Self {
		Self {
			action,
			message: message.into(),
			severity: Severity::Persistent,
			remedy: None,
		}
	}

	pub fn remedy_items(&self) -> &[String] {
		self.remedy.as_ref().map(|r| r.items.as_slice()).unwrap_or_default()
	}
}

impl fmt::Display for FailureNotice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} failed: {}", self.action, self.message)?;
		if let Some(remedy) = &self.remedy {
			let label = match remedy.kind {
				RemedyKind::Suggestions => "try",
				RemedyKind::AlternativeMethods => "alternative methods",
			};
			write!(f, " ({label}: {})", remedy.items.join(", "))?;
		}
		Ok(())
	}
}

/// Everything an observer can be told about a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
	ChannelStateChanged {
		state: ChannelState,
	},
	StatusUpdated(SystemStatus),
	ProgressUpdated(ProgressEvent),
	/// The server recovered from a detection failure; detection is re-issued
	/// after `delay_ms`.
	DetectionRetrying {
		attempt: u32,
		delay_ms: u64,
		message: String,
	},
	DetectionSucceeded(DetectionReport),
	DetectionFailed(FailureNotice),
	UnlockStarted {
		device_id: DeviceId,
		method: String,
		#[serde(flatten)]
		plan: UnlockPlan,
	},
	/// Hook for whoever renders progress; follows every `UnlockStarted`.
	ProgressTrackingRequested {
		device_id: DeviceId,
	},
	UnlockFailed(FailureNotice),
	InitializationFailed {
		message: String,
	},
}

impl SessionEvent {
	pub(crate) fn detection_retrying(attempt: u32, delay: Duration, message: &str) -> Self {
		SessionEvent::DetectionRetrying {
			attempt,
			delay_ms: delay.as_millis() as u64,
			message: message.to_string(),
		}
	}

	/// Stable kebab-case name, as used in the `event` field when serialized.
	pub fn name(&self) -> &'static str {
		match self {
			SessionEvent::ChannelStateChanged { .. } => "channel-state-changed",
			SessionEvent::StatusUpdated(_) => "status-updated",
			SessionEvent::ProgressUpdated(_) => "progress-updated",
			SessionEvent::DetectionRetrying { .. } => "detection-retrying",
			SessionEvent::DetectionSucceeded(_) => "detection-succeeded",
			SessionEvent::DetectionFailed(_) => "detection-failed",
			SessionEvent::UnlockStarted { .. } => "unlock-started",
			SessionEvent::ProgressTrackingRequested { .. } => "progress-tracking-requested",
			SessionEvent::UnlockFailed(_) => "unlock-failed",
			SessionEvent::InitializationFailed { .. } => "initialization-failed",
		}
	}
}
