
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Root CLI for pu.
#[derive(Parser, Debug)]
#[command(name = "pu")]
#[command(about = "Drive a device unlock server: detect, unlock, follow progress")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json, or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Unlock server base URL (overrides PU_SERVER_URL and the config file)
	#[arg(long, global = true, value_name = "URL")]
	pub server: Option<String>,

	/// Config file to load instead of $XDG_CONFIG_HOME/pu/config.json
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Show the server's component health
	Status,

	/// Detect the connected device
	Detect,

	/// Start unlocking a device and follow its progress
	Unlock(UnlockArgs),

	/// Stream progress events from the push channel
	Watch(WatchArgs),

	/// Detect the connected device, then unlock it
	Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct UnlockArgs {
	/// Device identifier as reported by detection
	#[arg(value_name = "DEVICE_ID")]
	pub device_id: String,

	#[command(flatten)]
	pub unlock: UnlockOptions,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	#[command(flatten)]
	pub unlock: UnlockOptions,
}

#[derive(Args, Debug, Clone)]
pub struct UnlockOptions {
	/// Unlock method understood by the server
	#[arg(short, long, default_value = pu::DEFAULT_UNLOCK_METHOD)]
	pub method: String,

	/// Return once the unlock has started instead of following progress
	#[arg(long)]
	pub no_follow: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
	/// Stop after the first event reporting 100% progress
	#[arg(long)]
	pub until_complete: bool,
}

impl Commands {
	/// Name used in result envelopes.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Status => "status",
			Commands::Detect => "detect",
			Commands::Unlock(_) => "unlock",
			Commands::Watch(_) => "watch",
			Commands::Run(_) => "run",
		}
	}
}
