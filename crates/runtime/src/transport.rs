//! Push-channel transport seam.
//!
//! [`EventChannel`](crate::EventChannel) never touches a socket directly: it
//! asks a [`Connector`] for a stream of [`Frame`]s. [`WebSocketConnector`] is
//! the production implementation.

use std::future::Future;
use std::pin::Pin;

use futures_util::future::ready;
use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::{Error, Result};

/// Inbound data frame. Control frames never reach the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	Text(String),
	Binary(Vec<u8>),
}

/// Inbound frames of one connection. The stream ending means the transport
/// closed; an `Err` item means it failed.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

/// Type alias for the boxed connect future.
pub type ConnectFuture<'a> = Pin<Box<dyn Future<Output = Result<FrameStream>> + Send + 'a>>;

/// Opens one push-channel connection.
pub trait Connector: Send + Sync + 'static {
	/// Resolves once the transport signals open, or fails.
	fn connect<'a>(&'a self, url: &'a Url) -> ConnectFuture<'a>;
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
	fn connect<'a>(&'a self, url: &'a Url) -> ConnectFuture<'a> {
		Box::pin(async move {
			let (ws, response) = tokio_tungstenite::connect_async(url.as_str())
				.await
				.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
			tracing::debug!(status = %response.status(), "WebSocket handshake complete");

			let frames = ws.filter_map(|message| {
				ready(match message {
					Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.to_string()))),
					Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes.to_vec()))),
					Ok(Message::Close(frame)) => {
						tracing::debug!(?frame, "WebSocket close frame received");
						None
					}
					Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
					Err(e) => Some(Err(Error::TransportError(e.to_string()))),
				})
			});

			Ok(Box::pin(frames) as FrameStream)
		})
	}
}
