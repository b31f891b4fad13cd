//! Per-controller session state and the in-flight guard.

use std::sync::Arc;

use parking_lot::Mutex;
use pu_protocol::{ActionKind, Device, ProgressEvent};
use pu_runtime::{ChannelState, Error, Result};

/// Mutable state owned by one controller.
#[derive(Debug)]
pub(crate) struct Session {
	pub(crate) channel_state: ChannelState,
	pub(crate) current_device: Option<Arc<Device>>,
	pub(crate) in_flight: Option<ActionKind>,
	pub(crate) latest_progress: Option<ProgressEvent>,
}

impl Default for Session {
	fn default() -> Self {
		Self {
			channel_state: ChannelState::Disconnected,
			current_device: None,
			in_flight: None,
			latest_progress: None,
		}
	}
}

/// Point-in-time copy of the session, for display and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
	pub channel_state: ChannelState,
	pub current_device: Option<Device>,
	pub in_flight: Option<ActionKind>,
	pub latest_progress: Option<ProgressEvent>,
}

impl Session {
	pub(crate) fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot {
			channel_state: self.channel_state,
			current_device: self.current_device.as_deref().cloned(),
			in_flight: self.in_flight,
			latest_progress: self.latest_progress.clone(),
		}
	}
}

/// Claims the in-flight slot for `kind`, or fails if another action holds it.
pub(crate) fn begin(session: &Arc<Mutex<Session>>, kind: ActionKind) -> Result<InFlightGuard> {
	let mut state = session.lock();
	if let Some(in_flight) = state.in_flight {
		return Err(Error::ActionInProgress {
			requested: kind,
			in_flight,
		});
	}
	state.in_flight = Some(kind);
	tracing::debug!(action = %kind, "action started");
	Ok(InFlightGuard {
		session: Arc::clone(session),
		kind: Some(kind),
	})
}

/// Holds the in-flight slot. Releases it on [`finish`](Self::finish) or drop,
/// so a cancelled action never leaves the slot claimed.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
	session: Arc<Mutex<Session>>,
	kind: Option<ActionKind>,
}

impl InFlightGuard {
	pub(crate) fn finish(mut self) {
		self.release();
	}

	fn release(&mut self) {
		if let Some(kind) = self.kind.take() {
			let mut state = self.session.lock();
			if state.in_flight == Some(kind) {
				state.in_flight = None;
			}
			tracing::debug!(action = %kind, "action finished");
		}
	}
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.release();
	}
}
