//! `pu watch`: stream the push channel without issuing actions.

use std::fmt;

use serde::Serialize;

use super::CommandCtx;
use super::progress::{Followed, ProgressTracker, StopReason};
use crate::cli::WatchArgs;
use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchData {
	#[serde(flatten)]
	pub followed: Followed,
	pub malformed_frames: u64,
	pub reconnects: u64,
}

impl fmt::Display for WatchData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self.followed.stop {
			StopReason::Completed => "progress complete",
			StopReason::Interrupted => "interrupted",
			StopReason::ChannelClosed => "channel closed",
		};
		write!(
			f,
			"{} event(s), {} malformed frame(s) dropped, {} reconnect(s); {reason}",
			self.followed.events, self.malformed_frames, self.reconnects
		)
	}
}

pub(crate) async fn execute(ctx: &CommandCtx<'_>, args: &WatchArgs) -> Result<()> {
	let tracker = ProgressTracker::attach(ctx.controller);
	if let Err(err) = ctx.controller.open_channel().await {
		// The channel keeps retrying on its own; watching is still useful.
		tracing::warn!(error = %err, "push channel not available yet, waiting for reconnect");
	}

	let followed = tracker.follow(args.until_complete).await;
	let stats = ctx.controller.channel_stats();
	ctx.emit_success(WatchData {
		followed,
		malformed_frames: stats.malformed_frames,
		reconnects: stats.reconnects_scheduled,
	});
	Ok(())
}
