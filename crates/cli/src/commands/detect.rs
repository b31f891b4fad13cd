//! `pu detect`: ask the server for the connected device.

use std::fmt;

use pu::{ActionOutcome, DetectionReport, Device, DeviceId};
use serde::Serialize;
use serde_json::Value;

use super::CommandCtx;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectData {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_id: Option<DeviceId>,
	pub device: Device,
	pub analysis: Value,
	pub recommended_actions: Vec<Value>,
}

impl From<DetectionReport> for DetectData {
	fn from(report: DetectionReport) -> Self {
		Self {
			device_id: report.device.device_id(),
			device: report.device,
			analysis: report.analysis,
			recommended_actions: report.recommended_actions,
		}
	}
}

impl fmt::Display for DetectData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "detected {}", self.device)?;
		if let Some(id) = &self.device_id {
			write!(f, "\n  id: {id}")?;
		}
		if !self.recommended_actions.is_empty() {
			let actions: Vec<String> = self
				.recommended_actions
				.iter()
				.map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string()))
				.collect();
			write!(f, "\n  recommended: {}", actions.join(", "))?;
		}
		Ok(())
	}
}

/// Initializes the session and runs detection, turning a surfaced failure
/// into an error.
pub(crate) async fn detect(ctx: &CommandCtx<'_>) -> Result<DetectData> {
	ctx.controller.initialize().await?;
	match ctx.controller.detect_device().await? {
		ActionOutcome::Completed(report) => Ok(report.into()),
		ActionOutcome::Failed(notice) => Err(CliError::ActionFailed(notice)),
	}
}

pub(crate) async fn execute(ctx: &CommandCtx<'_>) -> Result<()> {
	let data = detect(ctx).await?;
	ctx.emit_success(data);
	Ok(())
}
