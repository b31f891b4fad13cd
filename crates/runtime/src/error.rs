//! Error types for the unlock runtime.

use pu_protocol::ActionKind;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the unlock runtime.
///
/// Server-reported action failures are not errors; they are returned as
/// [`pu_protocol::ActionResult::Failure`].
#[derive(Debug, Error)]
pub enum Error {
	/// Failed to establish the push channel.
	#[error("Failed to connect push channel: {0}")]
	ConnectionFailed(String),

	/// I/O failure on an established push channel.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Push frame that could not be decoded as a progress event.
	#[error("Malformed frame: {0}")]
	MalformedFrame(String),

	/// HTTP client construction failure.
	#[error("HTTP client error: {0}")]
	Http(#[from] reqwest::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Server URL or path could not be parsed.
	#[error("Invalid URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	/// Invalid argument provided to method.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// A second action was requested while one is still in flight.
	#[error("Cannot start {requested}: {in_flight} is already in progress")]
	ActionInProgress { requested: ActionKind, in_flight: ActionKind },

	/// The session was disposed while the operation was pending.
	#[error("Session disposed")]
	Cancelled,

	/// Session startup failed (push channel or initial status snapshot).
	#[error("Initialization failed: {0}")]
	Initialization(String),
}

impl Error {
	/// Returns true if this error came from the re-entrancy guard.
	pub fn is_action_in_progress(&self) -> bool {
		matches!(self, Error::ActionInProgress { .. })
	}

	/// Returns true if the operation stopped because the session was disposed.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::Cancelled)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn action_in_progress_message_names_both_actions() {
		let err = Error::ActionInProgress {
			requested: ActionKind::Unlock,
			in_flight: ActionKind::Detection,
		};
		assert!(err.is_action_in_progress());
		assert_eq!(err.to_string(), "Cannot start unlock: detection is already in progress");
	}
}
