//! Health snapshot returned by `GET /health`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Point-in-time status of the server and its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	pub components: BTreeMap<String, ComponentStatus>,
}

/// Status of one server component. Extra fields (counters, recent activity)
/// are passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
	#[serde(default)]
	pub status: String,
	#[serde(flatten)]
	pub details: Map<String, Value>,
}

impl SystemStatus {
	/// Names of components not reporting `operational`/`healthy`/`ready`.
	pub fn degraded_components(&self) -> Vec<&str> {
		self.components
			.iter()
			.filter(|(_, c)| !matches!(c.status.as_str(), "operational" | "healthy" | "ready"))
			.map(|(name, _)| name.as_str())
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_health_snapshot() {
		let status: SystemStatus = serde_json::from_value(json!({
			"status": "healthy",
			"components": {
				"self_healing": {"status": "operational", "incidents_handled": 2},
				"deep_agents": {"status": "initializing"}
			}
		}))
		.unwrap();

		assert_eq!(status.status.as_deref(), Some("healthy"));
		assert_eq!(status.components["self_healing"].details["incidents_handled"], 2);
		assert_eq!(status.degraded_components(), vec!["deep_agents"]);
	}

	#[test]
	fn components_are_required() {
		assert!(serde_json::from_value::<SystemStatus>(json!({"status": "healthy"})).is_err());
	}
}
