//! Session configuration.

use std::time::Duration;

use pu_runtime::channel::DEFAULT_RECONNECT_DELAY;
use pu_runtime::endpoint::DEFAULT_PROGRESS_PATH;
use pu_runtime::{ChannelConfig, Endpoint, Error, Result};

use crate::recovery::DEFAULT_RETRY_DELAY;

/// Default unlock server address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Silent detection retries allowed before a recovered failure is surfaced.
pub const DEFAULT_MAX_SILENT_RETRIES: u32 = 3;

/// Settings for one [`SessionController`](crate::SessionController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	/// Base HTTP(S) URL of the unlock server.
	pub server_url: String,
	/// Path of the progress push channel on the same host.
	pub progress_path: String,
	/// Delay between a push-channel close and the next attempt.
	pub reconnect_delay: Duration,
	/// Delay before re-issuing a detection the server recovered from.
	pub retry_delay: Duration,
	/// Cap on consecutive silent detection retries. `None` retries for as
	/// long as the server keeps reporting recovery.
	pub max_silent_retries: Option<u32>,
	/// Per-request timeout for actions. `None` waits indefinitely.
	pub request_timeout: Option<Duration>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			server_url: DEFAULT_SERVER_URL.to_string(),
			progress_path: DEFAULT_PROGRESS_PATH.to_string(),
			reconnect_delay: DEFAULT_RECONNECT_DELAY,
			retry_delay: DEFAULT_RETRY_DELAY,
			max_silent_retries: Some(DEFAULT_MAX_SILENT_RETRIES),
			request_timeout: None,
		}
	}
}

impl SessionConfig {
	pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
		self.server_url = server_url.into();
		self
	}

	pub fn endpoint(&self) -> Result<Endpoint> {
		Endpoint::new(&self.server_url, &self.progress_path)
	}

	/// Checks the server URL and rejects zero delays and a zero timeout.
	pub fn validate(&self) -> Result<()> {
		self.endpoint()?;
		let durations = [
			("reconnect_delay", Some(self.reconnect_delay)),
			("retry_delay", Some(self.retry_delay)),
			("request_timeout", self.request_timeout),
		];
		for (name, duration) in durations {
			if duration.is_some_and(|d| d.is_zero()) {
				return Err(Error::InvalidArgument(format!("{name} must be greater than zero")));
			}
		}
		Ok(())
	}

	pub(crate) fn channel_config(&self) -> ChannelConfig {
		ChannelConfig {
			reconnect_delay: self.reconnect_delay,
		}
	}
}
