//! Server endpoint resolution.
//!
//! Action paths are resolved against the configured base URL. The push
//! channel uses the same host with the scheme mapped to its WebSocket
//! counterpart, so a server reached over TLS is watched over TLS.

use url::Url;

use crate::error::{Error, Result};

/// Default path of the progress push channel.
pub const DEFAULT_PROGRESS_PATH: &str = "/ws/unlock-progress";

/// Base address of the unlock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	base: Url,
	progress_path: String,
}

impl Endpoint {
	/// Parses `base` (must be `http` or `https`) and records the push path.
	pub fn new(base: &str, progress_path: &str) -> Result<Self> {
		let base = Url::parse(base)?;
		match base.scheme() {
			"http" | "https" => {}
			other => return Err(Error::InvalidArgument(format!("server URL must be http or https, got '{other}'"))),
		}
		if base.cannot_be_a_base() || base.host_str().is_none() {
			return Err(Error::InvalidArgument(format!("server URL has no host: {base}")));
		}
		Ok(Self {
			base,
			progress_path: progress_path.to_string(),
		})
	}

	/// Whether the server was reached over a secure scheme.
	pub fn is_secure(&self) -> bool {
		self.base.scheme() == "https"
	}

	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Resolves an action path such as `/api/detect-device`.
	pub fn action_url(&self, path: &str) -> Result<Url> {
		Ok(self.base.join(path)?)
	}

	/// `ws://` or `wss://` URL of the push channel.
	pub fn progress_url(&self) -> Result<Url> {
		let mut url = self.base.join(&self.progress_path)?;
		let scheme = if self.is_secure() { "wss" } else { "ws" };
		url.set_scheme(scheme)
			.map_err(|()| Error::InvalidArgument(format!("cannot derive push-channel URL from {}", self.base)))?;
		Ok(url)
	}
}
