use pu::{ActionKind, ChannelState, DeviceId, FailureNotice, ProgressEvent, SessionEvent, Severity, UnlockPlan};
use serde_json::json;

use super::*;

fn progress(json: serde_json::Value) -> SessionEvent {
	SessionEvent::ProgressUpdated(serde_json::from_value::<ProgressEvent>(json).unwrap())
}

#[test]
fn result_builder_success() {
	let result = ResultBuilder::new("status").data(json!({"status": "healthy"})).build();

	assert!(result.ok);
	assert_eq!(result.command, "status");
	assert_eq!(result.schema_version, SCHEMA_VERSION);
	assert!(result.error.is_none());
	assert!(result.timings.is_some());
}

#[test]
fn result_builder_error() {
	let result: CommandResult<()> = ResultBuilder::new("detect")
		.error(CommandError {
			code: ErrorCode::DetectionFailed,
			message: "unsupported".into(),
			details: None,
		})
		.build();

	assert!(!result.ok);
	assert!(result.data.is_none());
	assert_eq!(result.error.as_ref().unwrap().code, ErrorCode::DetectionFailed);
}

#[test]
fn envelope_serializes_camel_case() {
	let result = ResultBuilder::new("status").data(json!({})).build();
	let value = serde_json::to_value(&result).unwrap();
	assert_eq!(value["schemaVersion"], 1);
	assert_eq!(value["ok"], true);
	assert!(value["timings"]["durationMs"].is_u64());
	assert!(value.get("error").is_none());
}

#[test]
fn error_code_display_matches_serde() {
	for code in [ErrorCode::ActionInProgress, ErrorCode::InitializationFailed, ErrorCode::UnlockFailed] {
		assert_eq!(serde_json::to_value(code).unwrap(), json!(code.to_string()));
	}
}

#[test]
fn progress_renders_as_one_line() {
	let event = progress(json!({
		"overall_progress": 40,
		"current_step": "exploit",
		"step_progress": 50.0,
		"estimated_time_remaining": "2m",
		"warnings": ["slow usb"]
	}));
	assert_eq!(
		render_event_text(&event).unwrap(),
		"[ 40%] exploit (step 50%), 2m remaining, 1 warning(s)"
	);

	let numeric_eta = progress(json!({"overall_progress": 60, "current_step": "flash", "estimated_time_remaining": 90}));
	assert_eq!(render_event_text(&numeric_eta).unwrap(), "[ 60%] flash, 90s remaining");

	let bare = progress(json!({"overall_progress": 100, "current_step": "done"}));
	assert_eq!(render_event_text(&bare).unwrap(), "[100%] done");
}

#[test]
fn retry_and_unlock_events_render() {
	let retry = SessionEvent::DetectionRetrying {
		attempt: 2,
		delay_ms: 1000,
		message: "sensor busy".into(),
	};
	assert_eq!(
		render_event_text(&retry).unwrap(),
		"server recovered from \"sensor busy\", retrying detection in 1000ms (attempt 2)"
	);

	let started = SessionEvent::UnlockStarted {
		device_id: DeviceId::new("dev-1").unwrap(),
		method: "auto".into(),
		plan: serde_json::from_value::<UnlockPlan>(json!({"plan": {"steps": ["a", "b"]}})).unwrap(),
	};
	assert_eq!(render_event_text(&started).unwrap(), "unlock started on dev-1 using auto (2 steps)");
}

#[test]
fn transient_failures_render_as_notes_and_others_are_silent() {
	let transient = SessionEvent::UnlockFailed(FailureNotice {
		action: ActionKind::Unlock,
		message: "usb reset".into(),
		severity: Severity::Transient,
		remedy: None,
	});
	assert_eq!(render_event_text(&transient).unwrap(), "note: unlock failed: usb reset");

	let persistent = SessionEvent::DetectionFailed(FailureNotice::plain(ActionKind::Detection, "boom"));
	assert!(render_event_text(&persistent).is_none());
	let state = SessionEvent::ChannelStateChanged {
		state: ChannelState::Connected,
	};
	assert!(render_event_text(&state).is_none());
}
