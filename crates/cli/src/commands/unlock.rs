//! `pu unlock`: start an unlock and follow it.

use std::fmt;

use pu::{ActionOutcome, DeviceId, UnlockPlan};
use serde::Serialize;

use super::CommandCtx;
use super::progress::{Followed, ProgressTracker, StopReason};
use crate::cli::{UnlockArgs, UnlockOptions};
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockData {
	pub device_id: DeviceId,
	pub method: String,
	pub plan: UnlockPlan,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub progress: Option<Followed>,
}

impl fmt::Display for UnlockData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unlock of {} ({}) ", self.device_id, self.method)?;
		match &self.progress {
			None => write!(f, "started, {} steps planned", self.plan.steps().len()),
			Some(followed) => {
				let at = followed.last.as_ref().map(|p| p.overall_progress).unwrap_or(0);
				match followed.stop {
					StopReason::Completed => write!(f, "completed"),
					StopReason::Interrupted => write!(f, "still running at {at}% (stopped following)"),
					StopReason::ChannelClosed => write!(f, "left at {at}%, progress channel closed"),
				}
			}
		}
	}
}

/// Starts the unlock and, unless told otherwise, follows it to 100%.
///
/// The tracker is attached before the request so no early event is lost.
pub(crate) async fn unlock(ctx: &CommandCtx<'_>, device_id: &str, options: &UnlockOptions) -> Result<UnlockData> {
	let tracker = ProgressTracker::attach(ctx.controller);

	let plan = match ctx.controller.start_unlock(device_id, Some(&options.method)).await? {
		ActionOutcome::Completed(plan) => plan,
		ActionOutcome::Failed(notice) => return Err(CliError::ActionFailed(notice)),
	};

	let progress = if options.no_follow {
		None
	} else {
		Some(tracker.follow(true).await)
	};

	Ok(UnlockData {
		device_id: DeviceId::new(device_id).ok_or(CliError::NoDeviceId)?,
		method: options.method.clone(),
		plan,
		progress,
	})
}

pub(crate) async fn execute(ctx: &CommandCtx<'_>, args: &UnlockArgs) -> Result<()> {
	ctx.controller.initialize().await?;
	let data = unlock(ctx, &args.device_id, &args.unlock).await?;
	ctx.emit_success(data);
	Ok(())
}
