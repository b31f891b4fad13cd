use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::*;
use crate::transport::{ConnectFuture, Connector, Frame};

/// How the scripted connector answers the next attempt.
#[derive(Clone, Copy)]
enum Outcome {
	Accept,
	Refuse,
}

/// A connection opened by the scripted connector.
struct Session {
	opened_at: Instant,
	frames: mpsc::UnboundedSender<crate::Result<Frame>>,
}

/// Connector that records every attempt and hands the test the server side
/// of each accepted connection.
struct ScriptedConnector {
	script: Mutex<VecDeque<Outcome>>,
	attempts: Mutex<Vec<Instant>>,
	sessions: mpsc::UnboundedSender<Session>,
}

impl ScriptedConnector {
	fn new(script: &[Outcome]) -> (Arc<Self>, mpsc::UnboundedReceiver<Session>) {
		let (sessions, rx) = mpsc::unbounded_channel();
		let connector = Arc::new(Self {
			script: Mutex::new(script.iter().copied().collect()),
			attempts: Mutex::new(Vec::new()),
			sessions,
		});
		(connector, rx)
	}

	fn attempts(&self) -> Vec<Instant> {
		self.attempts.lock().clone()
	}
}

impl Connector for ScriptedConnector {
	fn connect<'a>(&'a self, _url: &'a Url) -> ConnectFuture<'a> {
		Box::pin(async move {
			self.attempts.lock().push(Instant::now());
			let outcome = self.script.lock().pop_front().unwrap_or(Outcome::Accept);
			match outcome {
				Outcome::Refuse => Err(Error::ConnectionFailed("connection refused".into())),
				Outcome::Accept => {
					let (tx, mut rx) = mpsc::unbounded_channel();
					let _ = self.sessions.send(Session {
						opened_at: Instant::now(),
						frames: tx,
					});
					let stream = futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx));
					Ok(Box::pin(stream) as FrameStream)
				}
			}
		})
	}
}

fn channel_with(
	connector: Arc<ScriptedConnector>,
) -> (EventChannel, mpsc::UnboundedReceiver<ProgressEvent>, CancellationToken) {
	let cancel = CancellationToken::new();
	let url = Url::parse("ws://127.0.0.1:8000/ws/unlock-progress").unwrap();
	let (channel, events) = EventChannel::new(url, connector, ChannelConfig::default(), cancel.clone());
	(channel, events, cancel)
}

fn text(json: &str) -> crate::Result<Frame> {
	Ok(Frame::Text(json.to_string()))
}

#[tokio::test(start_paused = true)]
async fn open_resolves_once_connected() {
	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, _events, _cancel) = channel_with(connector);

	assert_eq!(channel.state(), ChannelState::Disconnected);
	channel.open().await.unwrap();
	assert_eq!(channel.state(), ChannelState::Connected);
	assert!(sessions.recv().await.is_some());
	assert_eq!(channel.stats().connect_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn forced_closures_schedule_one_delayed_reconnect_each() {
	const CLOSURES: usize = 4;

	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, _events, _cancel) = channel_with(Arc::clone(&connector));
	let mut states = channel.watch_state();
	let seen = Arc::new(Mutex::new(Vec::new()));
	let recorder = {
		let seen = Arc::clone(&seen);
		tokio::spawn(async move {
			while states.changed().await.is_ok() {
				seen.lock().push(*states.borrow());
			}
		})
	};

	channel.open().await.unwrap();

	let mut closed_at = Vec::new();
	for _ in 0..CLOSURES {
		let session = sessions.recv().await.unwrap();
		tokio::time::sleep(Duration::from_millis(250)).await;
		closed_at.push(Instant::now());
		drop(session.frames);
	}

	let last = sessions.recv().await.unwrap();
	assert_eq!(channel.state(), ChannelState::Connected);

	let attempts = connector.attempts();
	assert_eq!(attempts.len(), CLOSURES + 1);
	assert_eq!(channel.stats().reconnects_scheduled, CLOSURES as u64);
	for (close, attempt) in closed_at.iter().zip(attempts.iter().skip(1)) {
		assert!(attempt.duration_since(*close) >= DEFAULT_RECONNECT_DELAY);
	}
	assert!(last.opened_at >= *closed_at.last().unwrap() + DEFAULT_RECONNECT_DELAY);

	// Nothing else is in flight once the last connection is up.
	tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 3).await;
	assert_eq!(connector.attempts().len(), CLOSURES + 1);

	channel.close().await;
	recorder.abort();
	let seen = seen.lock().clone();
	assert!(!seen.is_empty());
	assert!(
		seen.iter()
			.all(|s| matches!(s, ChannelState::Disconnected | ChannelState::Connecting | ChannelState::Connected))
	);
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_is_dropped_without_reconnect() {
	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, mut events, _cancel) = channel_with(Arc::clone(&connector));
	channel.open().await.unwrap();
	let session = sessions.recv().await.unwrap();

	session.frames.send(text("this is not json")).unwrap();
	session.frames.send(Ok(Frame::Binary(vec![0, 1, 2]))).unwrap();
	session.frames.send(text(r#"{"overall_progress": 10, "current_step": "scan"}"#)).unwrap();

	let event = events.recv().await.unwrap();
	assert_eq!(event.overall_progress, 10);
	assert_eq!(event.current_step, "scan");
	assert!(events.try_recv().is_err());

	tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 2).await;
	assert_eq!(channel.state(), ChannelState::Connected);
	assert_eq!(
		channel.stats(),
		ChannelStats {
			connect_attempts: 1,
			reconnects_scheduled: 0,
			malformed_frames: 2,
		}
	);
	assert!(sessions.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn events_are_delivered_in_order_without_dedup() {
	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, mut events, _cancel) = channel_with(connector);
	channel.open().await.unwrap();
	let session = sessions.recv().await.unwrap();

	let frame = r#"{"overall_progress": 50, "current_step": "flash"}"#;
	session.frames.send(text(r#"{"overall_progress": 10}"#)).unwrap();
	session.frames.send(text(frame)).unwrap();
	session.frames.send(text(frame)).unwrap();

	assert_eq!(events.recv().await.unwrap().overall_progress, 10);
	let first = events.recv().await.unwrap();
	let second = events.recv().await.unwrap();
	assert_eq!(first, second);
	assert_eq!(first.overall_progress, 50);
}

#[tokio::test(start_paused = true)]
async fn transport_error_disconnects_and_stops_delivery() {
	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, mut events, _cancel) = channel_with(Arc::clone(&connector));
	let mut states = channel.watch_state();
	channel.open().await.unwrap();
	let session = sessions.recv().await.unwrap();

	session.frames.send(Err(Error::TransportError("reset by peer".into()))).unwrap();
	states.wait_for(|s| *s == ChannelState::Disconnected).await.unwrap();

	// The old connection is gone; anything still written to it is lost.
	let _ = session.frames.send(text(r#"{"overall_progress": 99}"#));
	assert!(events.try_recv().is_err());

	let replacement = sessions.recv().await.unwrap();
	assert!(replacement.opened_at >= session.opened_at + DEFAULT_RECONNECT_DELAY);
	assert_eq!(channel.state(), ChannelState::Connected);
}

#[tokio::test(start_paused = true)]
async fn failed_first_attempt_is_reported_and_retried() {
	let (connector, mut sessions) = ScriptedConnector::new(&[Outcome::Refuse]);
	let (channel, _events, _cancel) = channel_with(Arc::clone(&connector));

	let err = channel.open().await.unwrap_err();
	assert!(matches!(err, Error::ConnectionFailed(_)));

	let session = sessions.recv().await.unwrap();
	let attempts = connector.attempts();
	assert_eq!(attempts.len(), 2);
	assert!(session.opened_at.duration_since(attempts[0]) >= DEFAULT_RECONNECT_DELAY);

	// Re-entering open() on a running loop waits for the connection.
	channel.open().await.unwrap();
	assert_eq!(channel.stats().connect_attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_pending_reconnect() {
	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, _events, cancel) = channel_with(Arc::clone(&connector));
	channel.open().await.unwrap();

	let session = sessions.recv().await.unwrap();
	drop(session.frames);
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(channel.state(), ChannelState::Disconnected);

	cancel.cancel();
	tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 4).await;

	assert_eq!(connector.attempts().len(), 1);
	assert_eq!(channel.state(), ChannelState::Disconnected);
	assert!(matches!(channel.open().await, Err(Error::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn close_waits_for_loop_exit() {
	let (connector, mut sessions) = ScriptedConnector::new(&[]);
	let (channel, _events, _cancel) = channel_with(Arc::clone(&connector));
	channel.open().await.unwrap();
	let _session = sessions.recv().await.unwrap();

	channel.close().await;
	assert_eq!(channel.state(), ChannelState::Disconnected);
	assert_eq!(channel.stats().reconnects_scheduled, 0);
}
