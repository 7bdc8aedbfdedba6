use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use composer::{ComposerConfig, ConfigOverrides, TransportMode};

use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "composer")]
#[command(about = "Live markdown previews from your editor")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Serve the editor host protocol (JSON lines on stdin/stdout)
	Host(HostArgs),

	/// Decode renderer frames and print them as JSON lines
	Dump(DumpArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
	/// Loopback socket the renderer connects back to
	Listen,
	/// Renderer's stdin
	Pipe,
}

impl From<TransportArg> for TransportMode {
	fn from(arg: TransportArg) -> Self {
		match arg {
			TransportArg::Listen => TransportMode::Listen,
			TransportArg::Pipe => TransportMode::Pipe,
		}
	}
}

#[derive(Args, Debug, Default)]
pub struct HostArgs {
	/// Config file (default: <config dir>/markdown-composer/config.json)
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Browser the renderer should open
	#[arg(long, value_name = "NAME")]
	pub browser: Option<String>,

	/// Do not open a browser when the renderer starts
	#[arg(long)]
	pub no_browser: bool,

	/// Syntax highlighting theme
	#[arg(long, value_name = "NAME")]
	pub highlight_theme: Option<String>,

	/// Stylesheet URL or path
	#[arg(long, value_name = "URL")]
	pub custom_css: Option<String>,

	/// Only start on an explicit `start` request
	#[arg(long)]
	pub no_autostart: bool,

	/// How frames reach the renderer
	#[arg(long, value_enum)]
	pub transport: Option<TransportArg>,

	/// Renderer executable
	#[arg(long, value_name = "PATH")]
	pub renderer: Option<PathBuf>,

	/// Directory the renderer runs in
	#[arg(long, value_name = "DIR")]
	pub renderer_dir: Option<PathBuf>,
}

impl HostArgs {
	pub fn overrides(&self) -> ConfigOverrides {
		ConfigOverrides {
			browser: self.browser.clone(),
			open_browser: self.no_browser.then_some(false),
			highlight_theme: self.highlight_theme.clone(),
			custom_css: self.custom_css.clone(),
			autostart: self.no_autostart.then_some(false),
			transport: self.transport.map(Into::into),
			renderer: self.renderer.clone(),
			renderer_dir: self.renderer_dir.clone(),
		}
	}

	/// Loads the config file and applies the flags on top.
	pub fn load_config(&self) -> composer::Result<ComposerConfig> {
		let mut config = match &self.config {
			Some(path) => ComposerConfig::load(path)?,
			None => ComposerConfig::load_default()?,
		};
		config.apply(self.overrides());
		Ok(config)
	}
}

#[derive(Args, Debug)]
pub struct DumpArgs {
	/// Connect to the port found in the trailing arguments instead of reading stdin
	#[arg(long)]
	pub connect: bool,

	/// Write JSON lines here instead of stdout
	#[arg(short, long, value_name = "FILE")]
	pub output: Option<PathBuf>,

	/// Renderer invocation; only the port is used
	#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
	pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn host_flags_become_overrides() {
		let cli = Cli::try_parse_from([
			"composer",
			"host",
			"--browser",
			"firefox",
			"--no-browser",
			"--transport",
			"pipe",
		])
		.unwrap();

		let Commands::Host(args) = cli.command else {
			panic!("expected host command");
		};
		let overrides = args.overrides();
		assert_eq!(overrides.browser.as_deref(), Some("firefox"));
		assert_eq!(overrides.open_browser, Some(false));
		assert_eq!(overrides.autostart, None);
		assert_eq!(overrides.transport, Some(TransportMode::Pipe));
	}

	#[test]
	fn dump_accepts_renderer_invocation_after_separator() {
		let cli = Cli::try_parse_from([
			"composer",
			"-vv",
			"dump",
			"--connect",
			"--",
			"--no-browser",
			"40123",
			"# text",
		])
		.unwrap();

		assert_eq!(cli.verbose, 2);
		let Commands::Dump(args) = cli.command else {
			panic!("expected dump command");
		};
		assert!(args.connect);
		assert_eq!(args.args, ["--no-browser", "40123", "# text"]);
	}

	#[test]
	fn config_file_is_loaded_before_flags() {
		let temp = tempfile::TempDir::new().unwrap();
		let path = temp.path().join("config.json");
		std::fs::write(&path, r#"{"browser":"firefox","highlightTheme":"github"}"#).unwrap();

		let args = HostArgs {
			config: Some(path),
			browser: Some("chromium".into()),
			..Default::default()
		};
		let config = args.load_config().unwrap();

		assert_eq!(config.browser.as_deref(), Some("chromium"));
		assert_eq!(config.highlight_theme.as_deref(), Some("github"));
	}
}
