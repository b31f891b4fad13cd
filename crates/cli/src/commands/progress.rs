//! Following progress events until completion or Ctrl-C.

use pu::{ProgressEvent, SessionController, SessionEvent, Subscription};
use serde::Serialize;
use tokio::sync::mpsc;

/// Why following stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	Completed,
	Interrupted,
	ChannelClosed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Followed {
	pub events: usize,
	pub stop: StopReason,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last: Option<ProgressEvent>,
}

/// Collects progress events from the moment it is attached.
pub(crate) struct ProgressTracker {
	events: mpsc::UnboundedReceiver<ProgressEvent>,
	_subscription: Subscription,
}

impl ProgressTracker {
	/// Subscribes to `controller`. Progress from before this point is not
	/// collected.
	pub fn attach(controller: &SessionController) -> Self {
		let (tx, events) = mpsc::unbounded_channel();
		let subscription = controller.subscribe_from_now(move |event| {
			if let SessionEvent::ProgressUpdated(progress) = event {
				let _ = tx.send(progress.clone());
			}
		});
		Self {
			events,
			_subscription: subscription,
		}
	}

	/// Waits for events until one reports completion (when `stop_on_complete`),
	/// Ctrl-C, or the controller goes away.
	pub async fn follow(mut self, stop_on_complete: bool) -> Followed {
		let mut followed = Followed {
			events: 0,
			stop: StopReason::ChannelClosed,
			last: None,
		};
		loop {
			tokio::select! {
				_ = tokio::signal::ctrl_c() => {
					tracing::info!(events = followed.events, "stopped following progress");
					followed.stop = StopReason::Interrupted;
					return followed;
				}
				event = self.events.recv() => {
					let Some(event) = event else { return followed };
					followed.events += 1;
					let complete = event.is_complete();
					followed.last = Some(event);
					if complete && stop_on_complete {
						followed.stop = StopReason::Completed;
						return followed;
					}
				}
			}
		}
	}
}
