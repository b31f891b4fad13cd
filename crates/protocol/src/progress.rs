//! Progress frames delivered over the push channel.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of push-channel data describing how far the in-flight action got.
///
/// Only `overall_progress` is mandatory. Fields the client does not model are
/// collected into [`extra`](Self::extra) and handed to observers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
	/// Overall completion, 0 to 100 inclusive.
	#[serde(deserialize_with = "deserialize_percent")]
	pub overall_progress: u8,
	#[serde(default, deserialize_with = "or_default")]
	pub current_step: String,
	#[serde(default, deserialize_with = "or_default")]
	pub step_progress: f64,
	/// Passed through as sent; servers use ISO strings or epoch numbers.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<Value>,
	/// Passed through as sent: `"Unknown"`, `"2m"` or a number of seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub estimated_time_remaining: Option<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub active_agents: Vec<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub successes: Vec<Value>,
	/// Any other fields present on the frame.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl ProgressEvent {
	/// Decodes a text frame. Anything that is not a JSON object with a valid
	/// `overall_progress` is rejected.
	pub fn from_frame(text: &str) -> serde_json::Result<Self> {
		serde_json::from_str(text)
	}

	/// Returns true once the server reports the action as fully complete.
	pub fn is_complete(&self) -> bool {
		self.overall_progress >= 100
	}

	/// Remaining-time estimate for display. Numbers are read as seconds.
	pub fn eta_text(&self) -> Option<String> {
		match self.estimated_time_remaining.as_ref()? {
			Value::Null => None,
			Value::String(text) => Some(text.clone()),
			Value::Number(secs) => Some(format!("{secs}s")),
			other => Some(other.to_string()),
		}
	}
}

/// Treats an explicit `null` like a missing field.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
	D: Deserializer<'de>,
{
	let value = serde_json::Number::deserialize(deserializer)?;
	let percent = if let Some(n) = value.as_u64() {
		n
	} else {
		match value.as_f64() {
			Some(f) if f.fract() == 0.0 && f >= 0.0 => f as u64,
			_ => return Err(de::Error::custom(format!("overall_progress must be an integer, got {value}"))),
		}
	};
	if percent > 100 {
		return Err(de::Error::custom(format!("overall_progress out of range: {percent}")));
	}
	Ok(percent as u8)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_server_frame_with_passthrough_fields() {
		let frame = r#"{
			"timestamp": "2024-05-01T10:00:00",
			"overall_progress": 40,
			"current_step": "bypass",
			"step_progress": 12.5,
			"estimated_time_remaining": "Unknown",
			"active_agents": ["deep"],
			"warnings": [],
			"successes": [],
			"phase": "exploit"
		}"#;

		let event = ProgressEvent::from_frame(frame).unwrap();
		assert_eq!(event.overall_progress, 40);
		assert_eq!(event.current_step, "bypass");
		assert_eq!(event.step_progress, 12.5);
		assert_eq!(event.active_agents.len(), 1);
		assert_eq!(event.extra["phase"], "exploit");
		assert!(!event.is_complete());
	}

	#[test]
	fn passthrough_fields_keep_their_wire_type() {
		let event = ProgressEvent::from_frame(
			r#"{"overall_progress": 40, "current_step": "bypass", "step_progress": 10, "estimated_time_remaining": 120, "timestamp": 1714557600}"#,
		)
		.unwrap();
		assert_eq!(event.overall_progress, 40);
		assert_eq!(event.estimated_time_remaining, Some(Value::from(120)));
		assert_eq!(event.timestamp, Some(Value::from(1714557600)));
		assert_eq!(event.eta_text().as_deref(), Some("120s"));

		let unknown = ProgressEvent::from_frame(r#"{"overall_progress": 0, "estimated_time_remaining": "Unknown"}"#).unwrap();
		assert_eq!(unknown.eta_text().as_deref(), Some("Unknown"));
	}

	#[test]
	fn null_step_fields_fall_back_to_defaults() {
		let event = ProgressEvent::from_frame(r#"{"overall_progress": 5, "current_step": null, "step_progress": null}"#).unwrap();
		assert_eq!(event.current_step, "");
		assert_eq!(event.step_progress, 0.0);
		assert_eq!(event.eta_text(), None);
	}

	#[test]
	fn integral_float_progress_is_accepted() {
		let event = ProgressEvent::from_frame(r#"{"overall_progress": 100.0}"#).unwrap();
		assert_eq!(event.overall_progress, 100);
		assert!(event.is_complete());
		assert_eq!(event.current_step, "");
	}

	#[test]
	fn rejects_non_json_and_out_of_range_frames() {
		assert!(ProgressEvent::from_frame("not json").is_err());
		assert!(ProgressEvent::from_frame(r#"{"current_step": "x"}"#).is_err());
		assert!(ProgressEvent::from_frame(r#"{"overall_progress": 101}"#).is_err());
		assert!(ProgressEvent::from_frame(r#"{"overall_progress": -3}"#).is_err());
		assert!(ProgressEvent::from_frame(r#"{"overall_progress": 2.5}"#).is_err());
		assert!(ProgressEvent::from_frame("[1, 2]").is_err());
	}
}
