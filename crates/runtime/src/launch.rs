//! Renderer invocation
//!
//! Turns a [`ConfigSnapshot`] into the renderer's command-line arguments:
//!
//! ```text
//! <renderer> [--browser=<name>] [--no-browser] [--highlight-theme=<name>]
//!            [--custom-css=<url>] [--working-directory=<cwd>]
//!            [<port>] <initial-text> [<file-path>]
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Values read once when the renderer is launched.
///
/// Built by the editor side and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
	/// Browser the renderer should open instead of the system default.
	pub browser: Option<String>,
	/// Whether the renderer opens a browser on startup.
	pub open_browser: bool,
	/// Syntax highlighting theme.
	pub highlight_theme: Option<String>,
	/// Stylesheet URL or path replacing the default styling.
	pub custom_css: Option<String>,
	/// Whether recognizing a document starts the bridge on its own.
	pub autostart: bool,
	/// Buffer text at launch time.
	pub initial_text: String,
	/// Directory static assets are served from.
	pub working_dir: Option<PathBuf>,
	/// File backing the buffer, if any.
	pub file_path: Option<PathBuf>,
}

impl Default for ConfigSnapshot {
	fn default() -> Self {
		Self {
			browser: None,
			open_browser: true,
			highlight_theme: None,
			custom_css: None,
			autostart: true,
			initial_text: String::new(),
			working_dir: None,
			file_path: None,
		}
	}
}

/// Which transport a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
	/// Bind a loopback socket; the renderer connects back.
	#[default]
	Listen,
	/// Write to the renderer's stdin.
	Pipe,
}

impl std::fmt::Display for TransportMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TransportMode::Listen => f.write_str("listen"),
			TransportMode::Pipe => f.write_str("pipe"),
		}
	}
}

/// Transport-specific launch details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHint {
	/// The renderer must connect back to this loopback port.
	Listen { port: u16 },
	/// The renderer reads frames from stdin.
	Pipe,
}

impl TransportHint {
	pub fn mode(&self) -> TransportMode {
		match self {
			TransportHint::Listen { .. } => TransportMode::Listen,
			TransportHint::Pipe => TransportMode::Pipe,
		}
	}
}

/// Builds the renderer arguments for one launch.
///
/// The file path is appended only when it names an existing file, so an
/// unsaved buffer contributes its text but no path.
pub fn build_args(snapshot: &ConfigSnapshot, hint: &TransportHint) -> Vec<OsString> {
	let mut args: Vec<OsString> = Vec::new();

	if let Some(browser) = &snapshot.browser {
		args.push(format!("--browser={browser}").into());
	}

	if !snapshot.open_browser {
		args.push("--no-browser".into());
	}

	if let Some(theme) = &snapshot.highlight_theme {
		args.push(format!("--highlight-theme={theme}").into());
	}

	if let Some(css) = &snapshot.custom_css {
		args.push(format!("--custom-css={css}").into());
	}

	if let Some(cwd) = &snapshot.working_dir {
		let mut arg = OsString::from("--working-directory=");
		arg.push(cwd);
		args.push(arg);
	}

	if let TransportHint::Listen { port } = hint {
		args.push(port.to_string().into());
	}

	args.push(snapshot.initial_text.clone().into());

	if let Some(file) = snapshot.file_path.as_ref().filter(|path| path.is_file()) {
		args.push(file.clone().into_os_string());
	}

	args
}
