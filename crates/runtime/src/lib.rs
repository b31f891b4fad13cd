//! Unlock Runtime - push channel, action client and error taxonomy
//!
//! This crate provides the transport layer of an unlock session:
//!
//! - **Endpoint**: Resolving HTTP action URLs and the push-channel URL
//! - **Event channel**: Persistent WebSocket with unconditional reconnection
//! - **Action client**: Request/response calls normalized into `ActionResult`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │     pu       │  SessionController, RecoveryPolicy
//! └──────┬───────┘
//!        │ ActionApi / EventChannel
//! ┌──────▼───────┐
//! │  pu-runtime  │  This crate
//! │  ┌────────┐  │
//! │  │Channel │  │  Reconnecting push channel
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │Actions │  │  HTTP envelopes
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │Connect │  │  WebSocket transport seam
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! # Decoupling via Connector and ActionApi
//!
//! The channel opens connections through the [`Connector`] trait and the
//! controller issues actions through the [`ActionApi`] trait, so both can be
//! driven by scripted fakes in tests.

pub mod actions;
pub mod channel;
pub mod endpoint;
pub mod error;
pub mod transport;

pub use actions::{ActionApi, ActionClient};
pub use channel::{ChannelConfig, ChannelState, ChannelStats, EventChannel};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use transport::{ConnectFuture, Connector, Frame, FrameStream, WebSocketConnector};
