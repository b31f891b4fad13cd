use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = errors only (reconnect warnings would drown the progress output)
	// 1 (-v) = session lifecycle, reconnects and surfaced failures
	// 2+ (-vv) = frames, requests and state transitions
	let filter = match verbosity {
		0 => "error",
		1 => "info,hyper=warn,reqwest=warn,tungstenite=warn",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
