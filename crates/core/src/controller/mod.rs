//! Session lifecycle and action orchestration.
//!
//! A [`SessionController`] owns one push channel, one action client and the
//! session state they feed. It is explicitly constructed and explicitly
//! disposed; nothing about a session lives in globals.
//!
//! # Actions
//!
//! At most one action is in flight. A second [`detect_device`] or
//! [`start_unlock`] while the first is pending fails with
//! [`Error::ActionInProgress`] instead of racing.
//!
//! Failed actions go through [`RecoveryPolicy`] exactly once per failure.
//! Detection re-issues itself after a silent retry delay, up to
//! [`SessionConfig::max_silent_retries`] times. Unlock never retries on its
//! own: a recovered unlock failure is surfaced as a transient notice.
//!
//! [`detect_device`]: SessionController::detect_device
//! [`start_unlock`]: SessionController::start_unlock

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use pu_protocol::{
	ActionKind, ActionResult, DEFAULT_UNLOCK_METHOD, DetectionReport, Device, DeviceId, ProgressEvent, SystemStatus,
	UnlockPlan,
};
use pu_runtime::{
	ActionApi, ActionClient, ChannelState, ChannelStats, Connector, Error, EventChannel, Result, WebSocketConnector,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::events::{FailureNotice, SessionEvent};
use crate::observers::{ObserverRegistry, Subscription};
use crate::recovery::{RecoveryAction, RecoveryPolicy};
use crate::session::{self, Session, SessionSnapshot};


/// Outcome of an action that ran to completion.
///
/// Server-reported failures are values here, not errors; they have already
/// been classified and published by the time the caller sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome<T> {
	Completed(T),
	Failed(FailureNotice),
}

impl<T> ActionOutcome<T> {
	pub fn is_completed(&self) -> bool {
		matches!(self, ActionOutcome::Completed(_))
	}

	pub fn completed(self) -> Option<T> {
		match self {
			ActionOutcome::Completed(value) => Some(value),
			ActionOutcome::Failed(_) => None,
		}
	}

	pub fn notice(&self) -> Option<&FailureNotice> {
		match self {
			ActionOutcome::Failed(notice) => Some(notice),
			ActionOutcome::Completed(_) => None,
		}
	}
}

/// Orchestrates one unlock session.
pub struct SessionController {
	server_url: String,
	actions: Arc<dyn ActionApi>,
	channel: EventChannel,
	policy: RecoveryPolicy,
	max_silent_retries: Option<u32>,
	session: Arc<Mutex<Session>>,
	observers: Arc<ObserverRegistry>,
	/// Held while a progress event is cached and dispatched, and while a new
	/// observer is registered and handed the cached event. Reentrant so
	/// observers may subscribe from inside a dispatch.
	progress_order: Arc<ReentrantMutex<()>>,
	cancel: CancellationToken,
	events: Mutex<Option<mpsc::UnboundedReceiver<ProgressEvent>>>,
	forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
	/// Builds a controller that talks HTTP and WebSocket to
	/// `config.server_url`.
	pub fn new(config: SessionConfig) -> Result<Self> {
		let endpoint = config.endpoint()?;
		let actions = ActionClient::new(endpoint, config.request_timeout)?;
		Self::with_transport(&config, Arc::new(actions), Arc::new(WebSocketConnector))
	}

	/// Builds a controller over caller-supplied transports.
	///
	/// Fails with [`Error::InvalidArgument`] when `config` does not validate.
	pub fn with_transport(config: &SessionConfig, actions: Arc<dyn ActionApi>, connector: Arc<dyn Connector>) -> Result<Self> {
		config.validate()?;
		let progress_url = config.endpoint()?.progress_url()?;
		let cancel = CancellationToken::new();
		let (channel, events) = EventChannel::new(progress_url, connector, config.channel_config(), cancel.child_token());

		Ok(Self {
			server_url: config.server_url.clone(),
			actions,
			channel,
			policy: RecoveryPolicy::new(config.retry_delay),
			max_silent_retries: config.max_silent_retries,
			session: Arc::new(Mutex::new(Session::default())),
			observers: Arc::new(ObserverRegistry::default()),
			progress_order: Arc::new(ReentrantMutex::new(())),
			cancel,
			events: Mutex::new(Some(events)),
			forwarder: Mutex::new(None),
		})
	}

	/// Registers an observer for every [`SessionEvent`].
	///
	/// If a progress event has already arrived, the observer is immediately
	/// handed the most recent one.
	///
	/// The replayed event always comes before, and is older than, every live
	/// progress event the observer receives afterwards.
	pub fn subscribe<F>(&self, observer: F) -> Subscription
	where
		F: Fn(&SessionEvent) + Send + Sync + 'static,
	{
		let observer = Arc::new(observer);
		let _order = self.progress_order.lock();
		let latest = self.session.lock().latest_progress.clone();
		if let Some(progress) = latest {
			observer(&SessionEvent::ProgressUpdated(progress));
		}
		self.observers.register(observer)
	}

	/// Registers an observer that only sees events published after this call.
	pub fn subscribe_from_now<F>(&self, observer: F) -> Subscription
	where
		F: Fn(&SessionEvent) + Send + Sync + 'static,
	{
		let _order = self.progress_order.lock();
		self.observers.register(Arc::new(observer))
	}

	/// Opens the push channel, then publishes the status snapshot.
	///
	/// A push channel that fails to open is fatal to startup and is reported
	/// as [`Error::Initialization`] after an `InitializationFailed`
	/// notification. The channel keeps reconnecting in the background
	/// regardless. A failed status request is reported the same way.
	pub async fn initialize(&self) -> Result<SystemStatus> {
		if let Err(err) = self.open_channel().await {
			if err.is_cancelled() {
				return Err(err);
			}
			return Err(self.initialization_failed(format!("push channel unavailable: {err}")));
		}

		let result = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => return Err(Error::Cancelled),
			result = self.actions.fetch_status() => result,
		};

		match result {
			ActionResult::Success(status) => {
				tracing::info!(components = status.components.len(), "status snapshot received");
				self.observers.dispatch(&SessionEvent::StatusUpdated(status.clone()));
				Ok(status)
			}
			ActionResult::Failure(failure) => Err(self.initialization_failed(format!("status snapshot unavailable: {failure}"))),
		}
	}

	/// Starts forwarding push-channel events to observers and opens the
	/// channel. Safe to call more than once.
	pub async fn open_channel(&self) -> Result<()> {
		self.start_forwarder();
		self.channel.open().await
	}

	fn ensure_live(&self) -> Result<()> {
		if self.cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		Ok(())
	}

	fn initialization_failed(&self, message: String) -> Error {
		tracing::error!(%message, "session initialization failed");
		self.observers.dispatch(&SessionEvent::InitializationFailed { message: message.clone() });
		Error::Initialization(message)
	}

	fn start_forwarder(&self) {
		let Some(events) = self.events.lock().take() else {
			return;
		};
		let handle = tokio::spawn(forward(
			events,
			self.channel.watch_state(),
			Arc::clone(&self.session),
			Arc::clone(&self.observers),
			Arc::clone(&self.progress_order),
			self.cancel.child_token(),
		));
		*self.forwarder.lock() = Some(handle);
	}

	/// Asks the server to detect a connected device.
	///
	/// Holds the in-flight slot across silent retries; it is released before
	/// the final notification goes out.
	pub async fn detect_device(&self) -> Result<ActionOutcome<DetectionReport>> {
		self.ensure_live()?;
		let guard = session::begin(&self.session, ActionKind::Detection)?;
		let mut silent_retries: u32 = 0;

		loop {
			let result = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return Err(Error::Cancelled),
				result = self.actions.detect_device() => result,
			};

			let failure = match result {
				ActionResult::Success(report) => {
					tracing::info!(device = %report.device, "device detected");
					self.session.lock().current_device = Some(Arc::new(report.device.clone()));
					guard.finish();
					self.observers.dispatch(&SessionEvent::DetectionSucceeded(report.clone()));
					return Ok(ActionOutcome::Completed(report));
				}
				ActionResult::Failure(failure) => failure,
			};

			let decision = self.policy.decide(&failure, ActionKind::Detection);
			let RecoveryAction::SilentRetry { delay } = decision else {
				let notice = FailureNotice::new(ActionKind::Detection, &failure, &decision);
				guard.finish();
				self.observers.dispatch(&SessionEvent::DetectionFailed(notice.clone()));
				return Ok(ActionOutcome::Failed(notice));
			};

			if self.max_silent_retries.is_some_and(|max| silent_retries >= max) {
				tracing::warn!(retries = silent_retries, message = %failure.message, "silent retry budget exhausted");
				let notice = FailureNotice::plain(
					ActionKind::Detection,
					format!("{} (still failing after {silent_retries} automatic retries)", failure.message),
				);
				guard.finish();
				self.observers.dispatch(&SessionEvent::DetectionFailed(notice.clone()));
				return Ok(ActionOutcome::Failed(notice));
			}

			silent_retries += 1;
			tracing::info!(
				attempt = silent_retries,
				delay_ms = delay.as_millis() as u64,
				message = %failure.message,
				"server recovered detection failure, retrying"
			);
			self.observers
				.dispatch(&SessionEvent::detection_retrying(silent_retries, delay, &failure.message));

			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return Err(Error::Cancelled),
				_ = tokio::time::sleep(delay) => {}
			}
		}
	}

	/// Asks the server to start unlocking `device_id` with `method`
	/// (`"auto"` when `None` or blank).
	///
	/// Never retried automatically, even when the server reports recovery.
	pub async fn start_unlock(&self, device_id: &str, method: Option<&str>) -> Result<ActionOutcome<UnlockPlan>> {
		let device_id = DeviceId::new(device_id).ok_or_else(|| Error::InvalidArgument("device id is required".into()))?;
		let method = method
			.map(str::trim)
			.filter(|m| !m.is_empty())
			.unwrap_or(DEFAULT_UNLOCK_METHOD)
			.to_string();

		self.ensure_live()?;
		let guard = session::begin(&self.session, ActionKind::Unlock)?;
		let result = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => return Err(Error::Cancelled),
			result = self.actions.start_unlock(&device_id, &method) => result,
		};

		match result {
			ActionResult::Success(plan) => {
				tracing::info!(device_id = %device_id, %method, steps = plan.steps().len(), "unlock started");
				guard.finish();
				self.observers.dispatch(&SessionEvent::UnlockStarted {
					device_id: device_id.clone(),
					method,
					plan: plan.clone(),
				});
				self.observers.dispatch(&SessionEvent::ProgressTrackingRequested { device_id });
				Ok(ActionOutcome::Completed(plan))
			}
			ActionResult::Failure(failure) => {
				let decision = self.policy.decide(&failure, ActionKind::Unlock);
				if decision.is_silent_retry() {
					tracing::info!(message = %failure.message, "server recovered unlock failure; not retrying automatically");
				}
				let notice = FailureNotice::new(ActionKind::Unlock, &failure, &decision);
				guard.finish();
				self.observers.dispatch(&SessionEvent::UnlockFailed(notice.clone()));
				Ok(ActionOutcome::Failed(notice))
			}
		}
	}

	/// Stops the push channel, any pending retry and event forwarding.
	///
	/// Pending actions return [`Error::Cancelled`]. Idempotent.
	pub async fn dispose(&self) {
		self.cancel.cancel();
		self.channel.close().await;
		let handle = self.forwarder.lock().take();
		if let Some(handle) = handle {
			let _ = handle.await;
		}
		self.session.lock().channel_state = self.channel.state();
		tracing::debug!("session disposed");
	}

	pub fn server_url(&self) -> &str {
		&self.server_url
	}

	pub fn is_disposed(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		self.session.lock().snapshot()
	}

	pub fn current_device(&self) -> Option<Arc<Device>> {
		self.session.lock().current_device.clone()
	}

	pub fn in_flight(&self) -> Option<ActionKind> {
		self.session.lock().in_flight
	}

	pub fn channel_state(&self) -> ChannelState {
		self.session.lock().channel_state
	}

	pub fn latest_progress(&self) -> Option<ProgressEvent> {
		self.session.lock().latest_progress.clone()
	}

	pub fn channel_stats(&self) -> ChannelStats {
		self.channel.stats()
	}

	pub fn observer_count(&self) -> usize {
		self.observers.len()
	}
}

impl Drop for SessionController {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

/// Mirrors channel state into the session and fans progress events out to
/// observers in arrival order.
async fn forward(
	mut events: mpsc::UnboundedReceiver<ProgressEvent>,
	mut states: watch::Receiver<ChannelState>,
	session: Arc<Mutex<Session>>,
	observers: Arc<ObserverRegistry>,
	progress_order: Arc<ReentrantMutex<()>>,
	cancel: CancellationToken,
) {
	loop {
		tokio::select! {
			_ = cancel.cancelled() => break,
			event = events.recv() => {
				let Some(event) = event else { break };
				let _order = progress_order.lock();
				session.lock().latest_progress = Some(event.clone());
				observers.dispatch(&SessionEvent::ProgressUpdated(event));
			}
			changed = states.changed() => {
				if changed.is_err() {
					break;
				}
				let state = *states.borrow_and_update();
				session.lock().channel_state = state;
				observers.dispatch(&SessionEvent::ChannelStateChanged { state });
			}
		}
	}
	tracing::debug!("event forwarding stopped");
}
