//! Renderer executable discovery
//!
//! Handles locating the markdown renderer and describing how to invoke it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable naming the renderer executable (runtime override).
pub const RENDERER_ENV: &str = "COMPOSER_RENDERER";

/// Name of the renderer executable looked up on `PATH`.
pub const RENDERER_BINARY: &str = "markdown-composer";

/// How to invoke the renderer, before any per-launch arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererCommand {
	/// Executable to run.
	pub program: PathBuf,
	/// Arguments placed ahead of the generated invocation arguments.
	pub base_args: Vec<OsString>,
	/// Directory the renderer runs in (its "expected working directory").
	pub working_dir: Option<PathBuf>,
}

impl RendererCommand {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			base_args: Vec::new(),
			working_dir: None,
		}
	}

	/// Appends base arguments.
	pub fn with_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.base_args.extend(args.into_iter().map(Into::into));
		self
	}

	/// Runs the renderer inside `dir`.
	pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.working_dir = Some(dir.into());
		self
	}

	/// `cargo run --release --` inside a renderer source checkout.
	pub fn cargo(checkout: impl Into<PathBuf>) -> Self {
		Self::new("cargo")
			.with_args(["run", "--release", "--"])
			.in_dir(checkout)
	}
}

/// Where the renderer command comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererSource {
	/// Use exactly this command.
	Explicit(RendererCommand),
	/// Search the environment, optionally running the result inside a directory.
	Discover { working_dir: Option<PathBuf> },
}

impl Default for RendererSource {
	fn default() -> Self {
		RendererSource::Discover { working_dir: None }
	}
}

impl RendererSource {
	/// Resolves to a concrete command.
	///
	/// Discovery checks, in order:
	/// 1. `COMPOSER_RENDERER` environment variable
	/// 2. `markdown-composer` on `PATH`
	///
	/// # Errors
	///
	/// Returns [`Error::RendererNotFound`] if no candidate exists.
	pub fn resolve(&self) -> Result<RendererCommand> {
		match self {
			RendererSource::Explicit(command) => Ok(command.clone()),
			RendererSource::Discover { working_dir } => {
				let program = locate_renderer()?;
				let mut command = RendererCommand::new(program);
				command.working_dir = working_dir.clone();
				Ok(command)
			}
		}
	}
}

fn locate_renderer() -> Result<PathBuf> {
	if let Some(path) = try_renderer_env() {
		return Ok(path);
	}

	if let Some(path) = try_path_lookup() {
		return Ok(path);
	}

	Err(Error::RendererNotFound)
}

/// Try the `COMPOSER_RENDERER` environment variable
fn try_renderer_env() -> Option<PathBuf> {
	let value = std::env::var_os(RENDERER_ENV)?;
	resolve_candidate("COMPOSER_RENDERER", PathBuf::from(value))
}

/// Try `markdown-composer` on `PATH`
fn try_path_lookup() -> Option<PathBuf> {
	let path = which::which(RENDERER_BINARY).ok()?;
	resolve_candidate("PATH", path)
}

fn resolve_candidate(label: &str, path: PathBuf) -> Option<PathBuf> {
	let usable = is_executable_file(&path);
	debug!(
		target = "composer.supervisor",
		source = label,
		path = %path.display(),
		usable,
		"renderer candidate"
	);
	usable.then_some(path)
}

fn is_executable_file(path: &Path) -> bool {
	let Ok(metadata) = path.metadata() else {
		return false;
	};
	if !metadata.is_file() {
		return false;
	}

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		metadata.permissions().mode() & 0o111 != 0
	}

	#[cfg(not(unix))]
	{
		true
	}
}
