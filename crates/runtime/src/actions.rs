//! Request/response actions against the unlock server.
//!
//! Every call is a single attempt. Transport failures, non-2xx statuses and
//! undecodable bodies become [`Failure`]s without a self-healing descriptor;
//! server-reported failures keep the descriptor the server attached. Retrying
//! is left to the caller's recovery policy.

use std::time::Duration;

use async_trait::async_trait;
use pu_protocol::{ActionResult, DetectEnvelope, DetectionReport, DeviceId, Failure, SystemStatus, UnlockEnvelope, UnlockPlan};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::Result;

pub const HEALTH_PATH: &str = "/health";
pub const DETECT_DEVICE_PATH: &str = "/api/detect-device";
pub const START_UNLOCK_PATH: &str = "/api/start-unlock";

/// The three imperative calls a session can make.
#[async_trait]
pub trait ActionApi: Send + Sync {
	/// Health snapshot. No recovery protocol applies to it.
	async fn fetch_status(&self) -> ActionResult<SystemStatus>;

	async fn detect_device(&self) -> ActionResult<DetectionReport>;

	/// `method` is server-defined; callers default it to `"auto"`.
	async fn start_unlock(&self, device_id: &DeviceId, method: &str) -> ActionResult<UnlockPlan>;
}

/// HTTP implementation of [`ActionApi`].
#[derive(Debug, Clone)]
pub struct ActionClient {
	http: reqwest::Client,
	endpoint: Endpoint,
}

impl ActionClient {
	/// Builds a client. `request_timeout` of `None` means requests may hang
	/// for as long as the server does.
	pub fn new(endpoint: Endpoint, request_timeout: Option<Duration>) -> Result<Self> {
		let mut builder = reqwest::Client::builder();
		if let Some(timeout) = request_timeout {
			builder = builder.timeout(timeout);
		}
		Ok(Self {
			http: builder.build()?,
			endpoint,
		})
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	fn url(&self, path: &str) -> std::result::Result<Url, Failure> {
		self.endpoint
			.action_url(path)
			.map_err(|e| Failure::transport(format!("cannot build request URL: {e}")))
	}

	async fn read_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> std::result::Result<T, Failure> {
		let response = request.send().await.map_err(|e| Failure::transport(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			let body = body.trim();
			return Err(Failure::transport(if body.is_empty() {
				format!("HTTP {status}")
			} else {
				format!("HTTP {status}: {body}")
			}));
		}
		response
			.json::<T>()
			.await
			.map_err(|e| Failure::transport(format!("invalid response body: {e}")))
	}
}

fn flatten<T>(result: std::result::Result<ActionResult<T>, Failure>) -> ActionResult<T> {
	result.unwrap_or_else(ActionResult::Failure)
}

#[async_trait]
impl ActionApi for ActionClient {
	async fn fetch_status(&self) -> ActionResult<SystemStatus> {
		let result = async {
			let url = self.url(HEALTH_PATH)?;
			tracing::debug!(%url, "fetching status snapshot");
			Self::read_json::<SystemStatus>(self.http.get(url)).await.map(ActionResult::Success)
		}
		.await;
		log_outcome("status", flatten(result))
	}

	async fn detect_device(&self) -> ActionResult<DetectionReport> {
		let result = async {
			let url = self.url(DETECT_DEVICE_PATH)?;
			tracing::debug!(%url, "requesting device detection");
			let request = self.http.post(url).header(CONTENT_TYPE, "application/json");
			Self::read_json::<DetectEnvelope>(request).await.map(DetectEnvelope::into_result)
		}
		.await;
		log_outcome("detect-device", flatten(result))
	}

	async fn start_unlock(&self, device_id: &DeviceId, method: &str) -> ActionResult<UnlockPlan> {
		let result = async {
			let mut url = self.url(START_UNLOCK_PATH)?;
			url.query_pairs_mut()
				.append_pair("device_id", device_id.as_str())
				.append_pair("method", method);
			tracing::debug!(%url, "requesting unlock start");
			Self::read_json::<UnlockEnvelope>(self.http.post(url)).await.map(UnlockEnvelope::into_result)
		}
		.await;
		log_outcome("start-unlock", flatten(result))
	}
}

fn log_outcome<T>(action: &'static str, result: ActionResult<T>) -> ActionResult<T> {
	if let ActionResult::Failure(failure) = &result {
		tracing::warn!(
			action,
			message = %failure.message,
			self_healing = failure.self_healing.is_some(),
			"action failed"
		);
	}
	result
}
