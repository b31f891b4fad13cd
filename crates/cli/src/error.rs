use std::path::PathBuf;

use pu::{ActionKind, FailureNotice};
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("config file {path}: {message}")]
	Config { path: PathBuf, message: String },

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// The server reported the action as failed. Already classified by the
	/// recovery policy.
	#[error("{0}")]
	ActionFailed(FailureNotice),

	#[error("detected device has no usable identifier")]
	NoDeviceId,

	#[error(transparent)]
	Session(#[from] pu::Error),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::Config { path, .. } => (ErrorCode::ConfigError, Some(serde_json::json!({ "path": path }))),
			CliError::InvalidConfig(_) => (ErrorCode::ConfigError, None),
			CliError::ActionFailed(notice) => {
				let code = match notice.action {
					ActionKind::Detection => ErrorCode::DetectionFailed,
					ActionKind::Unlock => ErrorCode::UnlockFailed,
				};
				let details = serde_json::json!({
					"severity": notice.severity,
					"remedyKind": notice.remedy.as_ref().map(|r| r.kind),
					"remedies": notice.remedy_items(),
				});
				(code, Some(details))
			}
			CliError::NoDeviceId => (ErrorCode::DetectionFailed, None),
			CliError::Session(err) => (session_error_code(err), None),
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}

fn session_error_code(err: &pu::Error) -> ErrorCode {
	match err {
		pu::Error::ActionInProgress { .. } => ErrorCode::ActionInProgress,
		pu::Error::InvalidArgument(_) | pu::Error::InvalidUrl(_) => ErrorCode::InvalidInput,
		pu::Error::Initialization(_) | pu::Error::ConnectionFailed(_) => ErrorCode::InitializationFailed,
		pu::Error::Cancelled => ErrorCode::Interrupted,
		_ => ErrorCode::InternalError,
	}
}
