//! ActionClient against an in-process HTTP server.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use parking_lot::Mutex;
use pu_protocol::{ActionResult, DeviceId, SelfHealing};
use pu_runtime::{ActionApi, ActionClient, Endpoint};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Recorded {
	unlock_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
	detect_content_types: Arc<Mutex<Vec<String>>>,
}

async fn serve(detect_reply: Value, unlock_reply: Value) -> (String, Recorded) {
	let recorded = Recorded::default();
	let app = Router::new()
		.route(
			"/health",
			get(|| async {
				Json(json!({
					"status": "healthy",
					"components": {
						"self_healing": {"status": "operational", "success_rate": 1.0},
						"deep_agents": {"status": "operational"}
					}
				}))
			}),
		)
		.route(
			"/api/detect-device",
			post(move |State(rec): State<Recorded>, headers: HeaderMap| {
				let reply = detect_reply.clone();
				async move {
					let content_type = headers
						.get("content-type")
						.and_then(|v| v.to_str().ok())
						.unwrap_or_default()
						.to_string();
					rec.detect_content_types.lock().push(content_type);
					Json(reply)
				}
			}),
		)
		.route(
			"/api/start-unlock",
			post(move |State(rec): State<Recorded>, Query(query): Query<HashMap<String, String>>| {
				let reply = unlock_reply.clone();
				async move {
					rec.unlock_queries.lock().push(query);
					Json(reply)
				}
			}),
		)
		.with_state(recorded.clone());

	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	(format!("http://{addr}"), recorded)
}

fn client(base: &str) -> ActionClient {
	ActionClient::new(Endpoint::new(base, "/ws/unlock-progress").unwrap(), None).unwrap()
}

#[tokio::test]
async fn fetch_status_parses_components() {
	let (base, _) = serve(json!({}), json!({})).await;
	let status = client(&base).fetch_status().await.into_result().unwrap();

	assert_eq!(status.status.as_deref(), Some("healthy"));
	assert_eq!(status.components.len(), 2);
	assert!(status.degraded_components().is_empty());
}

#[tokio::test]
async fn detect_device_declares_json_and_normalizes_success() {
	let (base, recorded) = serve(
		json!({
			"success": true,
			"device": {"manufacturer": "Acme", "model": "A1", "serial_number": "SN-1", "os_version": "14", "device_id": "dev-1"},
			"analysis": {"security_level": "medium"},
			"recommended_actions": [{"action": "backup"}]
		}),
		json!({}),
	)
	.await;

	let report = client(&base).detect_device().await.into_result().unwrap();
	assert_eq!(report.device.device_id().unwrap().as_str(), "dev-1");
	assert_eq!(report.analysis["security_level"], "medium");
	assert_eq!(recorded.detect_content_types.lock().as_slice(), ["application/json"]);
}

#[tokio::test]
async fn detect_device_keeps_self_healing_descriptor() {
	let (base, _) = serve(
		json!({
			"success": false,
			"error": "unsupported",
			"self_healing": {"recovered": false, "suggestions": ["enable-debug-mode"]}
		}),
		json!({}),
	)
	.await;

	let result = client(&base).detect_device().await;
	let failure = result.failure().unwrap();
	assert_eq!(failure.message, "unsupported");
	assert_eq!(failure.self_healing.as_ref().unwrap().suggestions(), ["enable-debug-mode".to_string()]);
}

#[tokio::test]
async fn start_unlock_sends_device_and_method_as_query() {
	let (base, recorded) = serve(json!({}), json!({"success": true, "plan": {"steps": ["a", "b"]}, "logs": []})).await;

	let device = DeviceId::new("dev-1").unwrap();
	let plan = client(&base).start_unlock(&device, "auto").await.into_result().unwrap();

	assert_eq!(plan.steps().len(), 2);
	let queries = recorded.unlock_queries.lock();
	assert_eq!(queries.len(), 1);
	assert_eq!(queries[0]["device_id"], "dev-1");
	assert_eq!(queries[0]["method"], "auto");
}

#[tokio::test]
async fn start_unlock_failure_uses_alternative_methods() {
	let (base, _) = serve(
		json!({}),
		json!({
			"success": false,
			"error": "security patch blocks method",
			"self_healing": {"recovered": false, "reason": "No automatic recovery method available", "suggestions": []},
			"alternative_methods": ["frp_bypass"]
		}),
	)
	.await;

	let device = DeviceId::new("dev-1").unwrap();
	let result = client(&base).start_unlock(&device, "exploit").await;
	let healing = result.failure().and_then(|f| f.self_healing.clone()).unwrap();
	assert!(matches!(healing, SelfHealing::Unresolved { .. }));
	assert_eq!(healing.alternative_methods(), ["frp_bypass".to_string()]);
}

#[tokio::test]
async fn start_unlock_failure_with_strategy_objects_keeps_server_report() {
	let (base, _) = serve(
		json!({}),
		json!({
			"success": false,
			"error": "secure element locked",
			"self_healing": {
				"success": false,
				"recovered": false,
				"reason": "No automatic recovery method available",
				"suggestions": ["Check device connection"]
			},
			"alternative_methods": [
				{"strategy": "frp_bypass", "steps": [], "success_probability": 0.4, "risk_level": "low"},
				{"strategy": "recovery_mode", "steps": [], "success_probability": 0.2, "risk_level": "high"}
			]
		}),
	)
	.await;

	let device = DeviceId::new("dev-1").unwrap();
	let result = client(&base).start_unlock(&device, "auto").await;
	let failure = result.failure().unwrap();
	assert_eq!(failure.message, "secure element locked");
	let healing = failure.self_healing.clone().unwrap();
	assert_eq!(healing.suggestions(), ["Check device connection".to_string()]);
	assert_eq!(
		healing.alternative_methods(),
		["frp_bypass".to_string(), "recovery_mode".to_string()]
	);
}

#[tokio::test]
async fn unreachable_server_is_a_plain_failure() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let result = client(&format!("http://{addr}")).detect_device().await;
	match result {
		ActionResult::Failure(failure) => {
			assert!(!failure.message.is_empty());
			assert!(failure.self_healing.is_none());
		}
		ActionResult::Success(_) => panic!("expected failure"),
	}
}

#[tokio::test]
async fn http_error_status_is_a_plain_failure() {
	let app = Router::new().route("/health", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }));
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	let result = client(&format!("http://{addr}")).fetch_status().await;
	let failure = result.failure().unwrap();
	assert!(failure.message.contains("503"), "{}", failure.message);
	assert!(failure.message.contains("warming up"));
	assert!(failure.self_healing.is_none());
}
