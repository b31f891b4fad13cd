//! Result envelopes and event rendering.
//!
//! ## Output Contract
//!
//! With `--format json` or `--format ndjson` every command ends with one
//! result envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "detect",
//!   "data": { ... },
//!   "timings": { "durationMs": 812 }
//! }
//! ```
//!
//! On failure `data` is replaced by `error: {code, message, details?}`.
//! `ndjson` additionally streams every session event as one JSON line before
//! the envelope. `text` prints progress lines and a human summary instead.

#[cfg(test)]
mod tests;

use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use pu::SessionEvent;
use serde::Serialize;

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// One pretty-printed JSON envelope
	Json,
	/// Newline-delimited JSON: every event, then the envelope
	Ndjson,
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
		}
	}
}

/// The result envelope returned by every command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

/// Error information for failed commands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Push channel or status snapshot unavailable at startup
	InitializationFailed,
	/// Server could not detect a device
	DetectionFailed,
	/// Server refused or failed to start the unlock
	UnlockFailed,
	/// Another action is still running
	ActionInProgress,
	/// Invalid input provided
	InvalidInput,
	/// Config file missing or invalid
	ConfigError,
	/// Interrupted by the operator
	Interrupted,
	/// Unknown/internal error
	InternalError,
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let code = match self {
			ErrorCode::InitializationFailed => "INITIALIZATION_FAILED",
			ErrorCode::DetectionFailed => "DETECTION_FAILED",
			ErrorCode::UnlockFailed => "UNLOCK_FAILED",
			ErrorCode::ActionInProgress => "ACTION_IN_PROGRESS",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::Interrupted => "INTERRUPTED",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		f.write_str(code)
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// Builder for constructing command results.
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	/// Measure duration from `start` instead of from builder creation.
	pub fn started_at(mut self, start: Instant) -> Self {
		self.start_time = start;
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok,
			command: self.command,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
		}
	}
}

/// Print a command result to stdout in the specified format.
///
/// Text output uses the data's [`Display`](fmt::Display) rendering.
pub fn print_result<T: Serialize + fmt::Display>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			let mut stdout = io::stdout().lock();
			if let Some(data) = &result.data {
				let _ = writeln!(stdout, "{data}");
			} else if let Some(error) = &result.error {
				let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
			}
		}
	}
}

/// Print an error to stderr in human-readable format.
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
	if let Some(items) = error.details.as_ref().and_then(|d| d.get("remedies")).and_then(|r| r.as_array()) {
		for item in items.iter().filter_map(|i| i.as_str()) {
			eprintln!("  - {item}");
		}
	}
}

/// One-line human rendering of a session event, or `None` for events the
/// final summary or the logs already cover.
pub fn render_event_text(event: &SessionEvent) -> Option<String> {
	match event {
		SessionEvent::ProgressUpdated(progress) => {
			let mut line = format!("[{:>3}%] {}", progress.overall_progress, progress.current_step);
			if progress.step_progress > 0.0 {
				line.push_str(&format!(" (step {:.0}%)", progress.step_progress));
			}
			if let Some(eta) = progress.eta_text() {
				line.push_str(&format!(", {eta} remaining"));
			}
			if !progress.warnings.is_empty() {
				line.push_str(&format!(", {} warning(s)", progress.warnings.len()));
			}
			Some(line)
		}
		SessionEvent::DetectionRetrying {
			attempt,
			delay_ms,
			message,
		} => Some(format!(
			"server recovered from \"{message}\", retrying detection in {delay_ms}ms (attempt {attempt})"
		)),
		SessionEvent::UnlockStarted { device_id, method, plan } => Some(format!(
			"unlock started on {device_id} using {method} ({} steps)",
			plan.steps().len()
		)),
		SessionEvent::UnlockFailed(notice) | SessionEvent::DetectionFailed(notice) if notice.severity == pu::Severity::Transient => {
			Some(format!("note: {notice}"))
		}
		_ => None,
	}
}

/// Streams session events to stdout as they happen.
pub fn print_event(event: &SessionEvent, format: OutputFormat) {
	match format {
		OutputFormat::Text => {
			if let Some(line) = render_event_text(event) {
				println!("{line}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(event) {
				println!("{json}");
			}
		}
		OutputFormat::Json => {}
	}
}
