//! Client-side session manager for a device unlock server.
//!
//! The server exposes two transports: a persistent push channel streaming
//! [`ProgressEvent`]s and a handful of request/response actions. This crate
//! correlates them into one session:
//!
//! - [`SessionController`] owns the channel, the action client and the
//!   session state, and publishes [`SessionEvent`]s to observers.
//! - [`RecoveryPolicy`] decides what to do about each failed action based on
//!   the server's self-healing report.
//! - [`Subscription`] handles unregister their observer when dropped.
//!
//! # Example
//!
//! ```ignore
//! use pu::{SessionConfig, SessionController, SessionEvent};
//!
//! let controller = SessionController::new(SessionConfig::default())?;
//! let _sub = controller.subscribe(|event: &SessionEvent| println!("{}", event.name()));
//! controller.initialize().await?;
//! if let Some(report) = controller.detect_device().await?.completed() {
//!     if let Some(id) = report.device.device_id() {
//!         controller.start_unlock(id.as_str(), None).await?;
//!     }
//! }
//! controller.dispose().await;
//! ```

pub mod config;
pub mod controller;
pub mod events;
pub mod observers;
pub mod recovery;
mod session;

pub use config::SessionConfig;
pub use controller::{ActionOutcome, SessionController};
pub use events::{FailureNotice, Remedy, SessionEvent, Severity};
pub use observers::{ObserverId, Subscription};
pub use pu_protocol::{
	ActionKind, ActionResult, DEFAULT_UNLOCK_METHOD, DetectionReport, Device, DeviceId, Failure, ProgressEvent, SelfHealing,
	SystemStatus, UnlockPlan,
};
pub use pu_runtime::{ActionApi, ChannelState, ChannelStats, Connector, Error, Result};
pub use recovery::{RecoveryAction, RecoveryPolicy, RemedyKind};
pub use session::SessionSnapshot;
