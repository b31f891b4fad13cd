//! Persistent push channel for progress events.
//!
//! The channel owns one connection at a time and reconnects forever:
//!
//! ```text
//! Disconnected ──open()──▶ Connecting ──transport open──▶ Connected
//!      ▲                                                      │
//!      └──────────── close / error (reconnect after delay) ◀──┘
//! ```
//!
//! Every connection attempt, first or not, goes through the same
//! `connect_once` path. There is no backoff and no retry cap; the only way out
//! of the loop is the [`CancellationToken`] handed to [`EventChannel::new`].
//!
//! Decoded events go to a single sink returned from [`EventChannel::new`].
//! Fan-out to observers is the session controller's job.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use pu_protocol::ProgressEvent;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Connector, Frame, FrameStream};

#[cfg(test)]
mod tests;

/// Delay between a transport close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Connection state of the push channel. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
	Disconnected,
	Connecting,
	Connected,
}

/// Push-channel tuning.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
	pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			reconnect_delay: DEFAULT_RECONNECT_DELAY,
		}
	}
}

/// Counters describing the channel's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
	/// Connection attempts, including the first.
	pub connect_attempts: u64,
	/// Reconnections scheduled after a close or failed attempt.
	pub reconnects_scheduled: u64,
	/// Frames dropped because they did not decode.
	pub malformed_frames: u64,
}

/// Reconnecting push channel delivering [`ProgressEvent`]s to one sink.
pub struct EventChannel {
	inner: Arc<Inner>,
	task: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
	url: Url,
	connector: Arc<dyn Connector>,
	reconnect_delay: Duration,
	sink: mpsc::UnboundedSender<ProgressEvent>,
	state: watch::Sender<ChannelState>,
	cancel: CancellationToken,
	connect_attempts: AtomicU64,
	reconnects_scheduled: AtomicU64,
	malformed_frames: AtomicU64,
}

impl EventChannel {
	/// Creates a disconnected channel and the receiver for its events.
	///
	/// Cancelling `cancel` stops the connection loop, including any pending
	/// reconnection.
	pub fn new(
		url: Url,
		connector: Arc<dyn Connector>,
		config: ChannelConfig,
		cancel: CancellationToken,
	) -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
		let (sink, events) = mpsc::unbounded_channel();
		let (state, _) = watch::channel(ChannelState::Disconnected);

		let inner = Arc::new(Inner {
			url,
			connector,
			reconnect_delay: config.reconnect_delay,
			sink,
			state,
			cancel,
			connect_attempts: AtomicU64::new(0),
			reconnects_scheduled: AtomicU64::new(0),
			malformed_frames: AtomicU64::new(0),
		});

		(Self { inner, task: Mutex::new(None) }, events)
	}

	/// Opens the channel and suspends until it is connected.
	///
	/// The first call starts the connection loop and returns the outcome of
	/// its first attempt. A failed first attempt is reported here, but the
	/// loop keeps running and will reconnect after the configured delay.
	///
	/// Later calls wait for the running loop to reach
	/// [`Connected`](ChannelState::Connected).
	pub async fn open(&self) -> Result<()> {
		if self.inner.cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let first_attempt = {
			let mut task = self.task.lock();
			match task.as_ref() {
				Some(handle) if !handle.is_finished() => None,
				_ => {
					let (tx, rx) = oneshot::channel();
					*task = Some(tokio::spawn(Arc::clone(&self.inner).run(tx)));
					Some(rx)
				}
			}
		};

		match first_attempt {
			Some(rx) => rx.await.unwrap_or(Err(Error::Cancelled)),
			None => self.wait_connected().await,
		}
	}

	async fn wait_connected(&self) -> Result<()> {
		let mut state = self.inner.state.subscribe();
		tokio::select! {
			_ = self.inner.cancel.cancelled() => Err(Error::Cancelled),
			reached = state.wait_for(|s| *s == ChannelState::Connected) => reached.map(|_| ()).map_err(|_| Error::Cancelled),
		}
	}

	/// Stops the connection loop and waits for it to exit.
	pub async fn close(&self) {
		self.inner.cancel.cancel();
		let handle = self.task.lock().take();
		if let Some(handle) = handle {
			let _ = handle.await;
		}
	}

	pub fn state(&self) -> ChannelState {
		*self.inner.state.borrow()
	}

	/// Receiver that observes every state transition.
	pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
		self.inner.state.subscribe()
	}

	pub fn stats(&self) -> ChannelStats {
		ChannelStats {
			connect_attempts: self.inner.connect_attempts.load(Ordering::SeqCst),
			reconnects_scheduled: self.inner.reconnects_scheduled.load(Ordering::SeqCst),
			malformed_frames: self.inner.malformed_frames.load(Ordering::SeqCst),
		}
	}

	pub fn url(&self) -> &Url {
		&self.inner.url
	}
}

impl Drop for EventChannel {
	fn drop(&mut self) {
		self.inner.cancel.cancel();
	}
}

impl Inner {
	async fn run(self: Arc<Self>, first_attempt: oneshot::Sender<Result<()>>) {
		let mut first_attempt = Some(first_attempt);

		loop {
			match self.connect_once().await {
				Ok(frames) => {
					if let Some(tx) = first_attempt.take() {
						let _ = tx.send(Ok(()));
					}
					self.pump(frames).await;
				}
				Err(err) => {
					tracing::warn!(url = %self.url, error = %err, "push channel connection failed");
					if let Some(tx) = first_attempt.take() {
						let _ = tx.send(Err(err));
					}
				}
			}

			self.set_state(ChannelState::Disconnected);
			if self.cancel.is_cancelled() {
				break;
			}

			self.reconnects_scheduled.fetch_add(1, Ordering::SeqCst);
			tracing::info!(delay_ms = self.reconnect_delay.as_millis() as u64, "push channel reconnect scheduled");

			tokio::select! {
				_ = self.cancel.cancelled() => break,
				_ = tokio::time::sleep(self.reconnect_delay) => {}
			}
		}

		self.set_state(ChannelState::Disconnected);
		tracing::debug!(url = %self.url, "push channel loop stopped");
	}

	/// Single connection attempt, shared by the first open and every reconnect.
	async fn connect_once(&self) -> Result<FrameStream> {
		self.connect_attempts.fetch_add(1, Ordering::SeqCst);
		self.set_state(ChannelState::Connecting);
		tracing::debug!(url = %self.url, "connecting push channel");

		let frames = tokio::select! {
			_ = self.cancel.cancelled() => return Err(Error::Cancelled),
			result = self.connector.connect(&self.url) => result?,
		};

		self.set_state(ChannelState::Connected);
		tracing::info!(url = %self.url, "push channel connected");
		Ok(frames)
	}

	/// Reads frames until the transport closes, fails, or the loop is cancelled.
	async fn pump(&self, mut frames: FrameStream) {
		loop {
			let next = tokio::select! {
				_ = self.cancel.cancelled() => return,
				next = frames.next() => next,
			};

			match next {
				None => {
					tracing::info!("push channel closed by server");
					return;
				}
				Some(Err(err)) => {
					tracing::warn!(error = %err, "push channel transport error");
					return;
				}
				Some(Ok(Frame::Text(text))) => self.deliver(&text),
				Some(Ok(Frame::Binary(bytes))) => {
					self.malformed_frames.fetch_add(1, Ordering::SeqCst);
					tracing::warn!(len = bytes.len(), "dropping binary push frame");
				}
			}
		}
	}

	fn deliver(&self, text: &str) {
		match ProgressEvent::from_frame(text) {
			Ok(event) => {
				tracing::debug!(overall = event.overall_progress, step = %event.current_step, "progress event");
				if self.sink.send(event).is_err() {
					tracing::debug!("progress sink dropped, event discarded");
				}
			}
			Err(err) => {
				self.malformed_frames.fetch_add(1, Ordering::SeqCst);
				let err = Error::MalformedFrame(err.to_string());
				tracing::warn!(error = %err, "dropping push frame");
			}
		}
	}

	fn set_state(&self, next: ChannelState) {
		self.state.send_if_modified(|state| {
			if *state == next {
				return false;
			}
			tracing::debug!(from = ?*state, to = ?next, "push channel state");
			*state = next;
			true
		});
	}
}
