//! Device snapshots returned by detection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Immutable snapshot of a detected handset.
///
/// Replaced wholesale on every successful detection. Server-side identifiers
/// the client does not interpret are kept in [`identifiers`](Self::identifiers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
	#[serde(default)]
	pub manufacturer: String,
	#[serde(default)]
	pub model: String,
	#[serde(default)]
	pub serial_number: String,
	#[serde(default)]
	pub os_version: String,
	#[serde(flatten)]
	pub identifiers: Map<String, Value>,
}

impl Device {
	/// Identifier to pass back to `start-unlock` for this device.
	///
	/// Prefers an explicit `device_id` or `id` from the server and falls back
	/// to the serial number.
	pub fn device_id(&self) -> Option<DeviceId> {
		["device_id", "id"]
			.iter()
			.find_map(|key| self.identifiers.get(*key).and_then(Value::as_str))
			.and_then(DeviceId::new)
			.or_else(|| DeviceId::new(self.serial_number.as_str()))
	}
}

impl fmt::Display for Device {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.manufacturer, self.model)?;
		if !self.os_version.is_empty() {
			write!(f, " ({})", self.os_version)?;
		}
		if !self.serial_number.is_empty() {
			write!(f, " [{}]", self.serial_number)?;
		}
		Ok(())
	}
}

/// Non-empty identifier of a device, as understood by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
	/// Returns `None` for empty or whitespace-only identifiers.
	pub fn new(id: impl Into<String>) -> Option<Self> {
		let id = id.into();
		if id.trim().is_empty() { None } else { Some(Self(id)) }
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DeviceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Successful detection: the device plus the server's analysis of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
	pub device: Device,
	#[serde(default)]
	pub analysis: Value,
	#[serde(default)]
	pub recommended_actions: Vec<Value>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn device(value: Value) -> Device {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn device_id_prefers_explicit_identifier() {
		let d = device(json!({
			"manufacturer": "Acme",
			"model": "A1",
			"serial_number": "SN-9",
			"device_id": "dev-1"
		}));
		assert_eq!(d.device_id().unwrap().as_str(), "dev-1");
	}

	#[test]
	fn device_id_falls_back_to_serial() {
		let d = device(json!({"manufacturer": "Acme", "serial_number": "SN-9", "id": ""}));
		assert_eq!(d.device_id().unwrap().as_str(), "SN-9");

		let anonymous = device(json!({"manufacturer": "Acme"}));
		assert!(anonymous.device_id().is_none());
	}

	#[test]
	fn empty_device_id_is_rejected() {
		assert!(DeviceId::new("").is_none());
		assert!(DeviceId::new("   ").is_none());
		assert_eq!(DeviceId::new("dev-1").unwrap().to_string(), "dev-1");
	}

	#[test]
	fn display_includes_known_fields() {
		let d = device(json!({"manufacturer": "Acme", "model": "A1", "os_version": "14", "serial_number": "SN"}));
		assert_eq!(d.to_string(), "Acme A1 (14) [SN]");
	}
}
