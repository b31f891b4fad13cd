//! `pu status`: component health snapshot.

use std::collections::BTreeMap;
use std::fmt;

use pu::SystemStatus;
use serde::Serialize;

use super::CommandCtx;
use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
	pub server_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	pub components: BTreeMap<String, String>,
	pub degraded: Vec<String>,
}

impl StatusData {
	pub fn new(server_url: String, snapshot: &SystemStatus) -> Self {
		Self {
			server_url,
			status: snapshot.status.clone(),
			components: snapshot
				.components
				.iter()
				.map(|(name, component)| (name.clone(), component.status.clone()))
				.collect(),
			degraded: snapshot.degraded_components().into_iter().map(str::to_string).collect(),
		}
	}
}

impl fmt::Display for StatusData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{}: {}", self.server_url, self.status.as_deref().unwrap_or("unknown"))?;
		let width = self.components.keys().map(String::len).max().unwrap_or(0);
		for (name, status) in &self.components {
			writeln!(f, "  {name:<width$}  {status}")?;
		}
		if self.degraded.is_empty() {
			write!(f, "all components operational")
		} else {
			write!(f, "degraded: {}", self.degraded.join(", "))
		}
	}
}

pub(crate) async fn execute(ctx: &CommandCtx<'_>) -> Result<()> {
	let snapshot = ctx.controller.initialize().await?;
	ctx.emit_success(StatusData::new(ctx.controller.server_url().to_string(), &snapshot));
	Ok(())
}
