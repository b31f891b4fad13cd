//! `pu run`: detect, then unlock whatever was detected.

use std::fmt;

use serde::Serialize;

use super::CommandCtx;
use super::detect::{DetectData, detect};
use super::unlock::{UnlockData, unlock};
use crate::cli::RunArgs;
use crate::error::{CliError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
	pub detection: DetectData,
	pub unlock: UnlockData,
}

impl fmt::Display for RunData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}\n{}", self.detection, self.unlock)
	}
}

pub(crate) async fn execute(ctx: &CommandCtx<'_>, args: &RunArgs) -> Result<()> {
	let detection = detect(ctx).await?;
	let device_id = detection.device_id.clone().ok_or(CliError::NoDeviceId)?;
	tracing::info!(%device_id, method = %args.unlock.method, "unlocking detected device");

	let unlock = unlock(ctx, device_id.as_str(), &args.unlock).await?;
	ctx.emit_success(RunData { detection, unlock });
	Ok(())
}
