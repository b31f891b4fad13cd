//! Wire types for the unlock server protocol.
//!
//! This crate holds the value types exchanged with the unlock server over its
//! two transports:
//!
//! - **Push channel**: [`ProgressEvent`] frames, server to client only
//! - **Actions**: JSON envelopes for `/health`, `/api/detect-device` and
//!   `/api/start-unlock`, normalized into [`ActionResult`]
//!
//! Envelope types mirror the server's snake_case JSON. Normalization into the
//! client-side vocabulary ([`Failure`], [`SelfHealing`]) happens here so the
//! runtime never has to reason about optional wire fields.

pub mod device;
pub mod envelope;
pub mod outcome;
pub mod progress;
pub mod status;

pub use device::{DetectionReport, Device, DeviceId};
pub use envelope::{DetectEnvelope, SelfHealingWire, UnlockEnvelope, UnlockPlan};
pub use outcome::{ActionKind, ActionResult, Failure, SelfHealing};
pub use progress::ProgressEvent;
pub use status::{ComponentStatus, SystemStatus};

/// Unlock method requested when the caller does not pick one.
pub const DEFAULT_UNLOCK_METHOD: &str = "auto";
