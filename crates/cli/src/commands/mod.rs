mod detect;
mod progress;
mod run;
mod status;
mod unlock;
mod watch;

use std::fmt;
use std::time::Instant;

use pu::SessionController;
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::config::{self, Overrides};
use crate::error::Result;
use crate::output::{self, OutputFormat, ResultBuilder};

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	let config = config::resolve(Overrides::from_env(cli.config.as_deref(), cli.server.as_deref()))?;
	let controller = SessionController::new(config)?;
	let _printer = controller.subscribe(move |event| output::print_event(event, format));

	let started = Instant::now();
	let command = cli.command.name();
	tracing::debug!(command, %format, "dispatch");

	let ctx = CommandCtx {
		controller: &controller,
		format,
		command,
		started,
	};
	let result = match cli.command {
		Commands::Status => status::execute(&ctx).await,
		Commands::Detect => detect::execute(&ctx).await,
		Commands::Unlock(args) => unlock::execute(&ctx, &args).await,
		Commands::Watch(args) => watch::execute(&ctx, &args).await,
		Commands::Run(args) => run::execute(&ctx, &args).await,
	};

	controller.dispose().await;
	result
}

/// What every command gets to work with.
pub(crate) struct CommandCtx<'a> {
	pub controller: &'a SessionController,
	pub format: OutputFormat,
	pub command: &'static str,
	pub started: Instant,
}

impl CommandCtx<'_> {
	pub fn emit_success<T: Serialize + fmt::Display>(&self, data: T) {
		let result = ResultBuilder::new(self.command).started_at(self.started).data(data).build();
		output::print_result(&result, self.format);
	}
}
