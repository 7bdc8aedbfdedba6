//! Command-line host for the markdown-composer bridge.
//!
//! `composer host` lets an editor plugin drive a [`composer::Bridge`] over
//! stdin/stdout; `composer dump` decodes frames for debugging.

pub mod cli;
pub mod dump;
pub mod error;
pub mod host;
pub mod logging;
pub mod output;
pub mod styles;

use crate::cli::{Cli, Commands};

/// Runs the selected subcommand.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	match cli.command {
		Commands::Host(args) => {
			let config = args.load_config()?;
			host::execute(config).await?;
		}
		Commands::Dump(args) => dump::execute(args).await?,
	}
	Ok(())
}
