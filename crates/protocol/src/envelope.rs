//! Response envelopes for the action endpoints, as the server sends them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::device::{DetectionReport, Device};
use crate::outcome::{ActionResult, Failure, SelfHealing};

const UNKNOWN_ERROR: &str = "unknown error";

/// `self_healing` object attached to a failed envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfHealingWire {
	#[serde(default)]
	pub recovered: bool,
	#[serde(default, deserialize_with = "remedy_items", skip_serializing_if = "Option::is_none")]
	pub suggestions: Option<Vec<String>>,
	#[serde(default, deserialize_with = "remedy_items", skip_serializing_if = "Option::is_none")]
	pub alternative_methods: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl SelfHealingWire {
	/// Normalizes the wire descriptor.
	///
	/// Remediation lists on a recovered descriptor are dropped. `extra_alternatives`
	/// are appended to the descriptor's own alternatives, skipping duplicates.
	pub fn normalize(self, extra_alternatives: Vec<String>) -> SelfHealing {
		if self.recovered {
			return SelfHealing::Recovered {
				action: self.action,
				details: self.details,
			};
		}

		let mut alternative_methods = self.alternative_methods.unwrap_or_default();
		for method in extra_alternatives {
			if !alternative_methods.contains(&method) {
				alternative_methods.push(method);
			}
		}

		SelfHealing::Unresolved {
			reason: self.reason,
			suggestions: self.suggestions.unwrap_or_default(),
			alternative_methods,
		}
	}
}

/// Remedy lists arrive either as plain strings or as strategy objects such as
/// `{"strategy": "frp_bypass", "success_probability": 0.4, ...}`. Objects are
/// reduced to their `strategy`, `method` or `name`; entries without one are
/// skipped.
fn remedy_items<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
	D: Deserializer<'de>,
{
	let items = Option::<Vec<Value>>::deserialize(deserializer)?;
	Ok(items.map(|items| items.iter().filter_map(remedy_name).collect()))
}

fn remedy_name(item: &Value) -> Option<String> {
	let name = match item {
		Value::String(name) => name.as_str(),
		Value::Object(fields) => ["strategy", "method", "name"]
			.iter()
			.find_map(|key| fields.get(*key).and_then(Value::as_str))?,
		_ => return None,
	};
	let name = name.trim();
	(!name.is_empty()).then(|| name.to_string())
}

/// Envelope returned by `POST /api/detect-device`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectEnvelope {
	#[serde(default)]
	pub success: bool,
	#[serde(default)]
	pub device: Option<Device>,
	#[serde(default)]
	pub analysis: Option<Value>,
	#[serde(default)]
	pub recommended_actions: Option<Vec<Value>>,
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub self_healing: Option<SelfHealingWire>,
}

impl DetectEnvelope {
	pub fn into_result(self) -> ActionResult<DetectionReport> {
		if !self.success {
			let message = self.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
			let self_healing = self.self_healing.map(|wire| wire.normalize(Vec::new()));
			return ActionResult::Failure(Failure::reported(message, self_healing));
		}

		match self.device {
			Some(device) => ActionResult::Success(DetectionReport {
				device,
				analysis: self.analysis.unwrap_or(Value::Null),
				recommended_actions: self.recommended_actions.unwrap_or_default(),
			}),
			None => ActionResult::Failure(Failure::transport("detection reported success without a device")),
		}
	}
}

/// Plan accepted by `POST /api/start-unlock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockPlan {
	pub plan: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub logs: Vec<Value>,
}

impl UnlockPlan {
	/// Steps of the plan, when the server sent them as `plan.steps`.
	pub fn steps(&self) -> &[Value] {
		self.plan.get("steps").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
	}
}

/// Envelope returned by `POST /api/start-unlock`.
///
/// The server reports `alternative_methods` next to `self_healing` rather
/// than inside it; both locations are honored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnlockEnvelope {
	#[serde(default)]
	pub success: bool,
	#[serde(default)]
	pub plan: Option<Value>,
	#[serde(default)]
	pub result: Option<Value>,
	#[serde(default)]
	pub logs: Option<Vec<Value>>,
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub self_healing: Option<SelfHealingWire>,
	#[serde(default, deserialize_with = "remedy_items")]
	pub alternative_methods: Option<Vec<String>>,
}

impl UnlockEnvelope {
	pub fn into_result(self) -> ActionResult<UnlockPlan> {
		if !self.success {
			let message = self.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
			let top_level = self.alternative_methods.unwrap_or_default();
			let self_healing = match self.self_healing {
				Some(wire) => Some(wire.normalize(top_level)),
				None if !top_level.is_empty() => Some(SelfHealingWire::default().normalize(top_level)),
				None => None,
			};
			return ActionResult::Failure(Failure::reported(message, self_healing));
		}

		match self.plan {
			Some(plan) => ActionResult::Success(UnlockPlan {
				plan,
				result: self.result,
				logs: self.logs.unwrap_or_default(),
			}),
			None => ActionResult::Failure(Failure::transport("unlock reported success without a plan")),
		}
	}
}
