//! Bridge configuration.
//!
//! Settings live in a JSON file (camelCase keys) and can be overridden per
//! invocation. At start time they are frozen, together with the buffer state,
//! into a [`ConfigSnapshot`] that the renderer is launched from.
//!
//! ```json
//! {
//!   "browser": "firefox",
//!   "openBrowser": false,
//!   "highlightTheme": "github",
//!   "autostart": true,
//!   "transport": "listen",
//!   "renderer": "/usr/local/bin/markdown-composer"
//! }
//! ```

use std::path::{Path, PathBuf};

use composer_runtime::{ConfigSnapshot, RendererCommand, RendererSource, TransportMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::BufferState;

/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "markdown-composer";

/// File name of the config inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfig {
	/// Browser to open instead of the system default.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub browser: Option<String>,
	/// Open a browser when the renderer starts.
	pub open_browser: bool,
	/// Syntax highlighting theme.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub highlight_theme: Option<String>,
	/// Stylesheet URL or path.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub custom_css: Option<String>,
	/// Start automatically when a matching document is recognized.
	pub autostart: bool,
	pub transport: TransportMode,
	/// Renderer executable; discovered when unset.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub renderer: Option<PathBuf>,
	/// Arguments placed before the generated renderer arguments.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub renderer_args: Vec<String>,
	/// Directory the renderer runs in.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub renderer_dir: Option<PathBuf>,
	/// Document types that trigger auto-start.
	pub filetypes: Vec<String>,
}

impl Default for ComposerConfig {
	fn default() -> Self {
		Self {
			browser: None,
			open_browser: true,
			highlight_theme: None,
			custom_css: None,
			autostart: true,
			transport: TransportMode::default(),
			renderer: None,
			renderer_args: Vec::new(),
			renderer_dir: None,
			filetypes: vec!["markdown".to_string()],
		}
	}
}

/// Per-invocation overrides; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
	pub browser: Option<String>,
	pub open_browser: Option<bool>,
	pub highlight_theme: Option<String>,
	pub custom_css: Option<String>,
	pub autostart: Option<bool>,
	pub transport: Option<TransportMode>,
	pub renderer: Option<PathBuf>,
	pub renderer_dir: Option<PathBuf>,
}

/// Default config location: `<config_dir>/markdown-composer/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl ComposerConfig {
	/// Loads a config file.
	///
	/// # Errors
	///
	/// Returns [`Error::ConfigRead`] if the file cannot be read and
	/// [`Error::ConfigParse`] if it is not valid.
	pub fn load(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&contents).map_err(|source| Error::ConfigParse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Loads the default config file, or defaults if there is none.
	pub fn load_default() -> Result<Self> {
		match default_config_path() {
			Some(path) if path.exists() => {
				debug!(target = "composer.config", path = %path.display(), "loading config");
				Self::load(&path)
			}
			_ => Ok(Self::default()),
		}
	}

	/// Applies overrides on top of the loaded values.
	pub fn apply(&mut self, overrides: ConfigOverrides) {
		let ConfigOverrides {
			browser,
			open_browser,
			highlight_theme,
			custom_css,
			autostart,
			transport,
			renderer,
			renderer_dir,
		} = overrides;

		self.browser = browser.or(self.browser.take());
		self.open_browser = open_browser.unwrap_or(self.open_browser);
		self.highlight_theme = highlight_theme.or(self.highlight_theme.take());
		self.custom_css = custom_css.or(self.custom_css.take());
		self.autostart = autostart.unwrap_or(self.autostart);
		self.transport = transport.unwrap_or(self.transport);
		self.renderer = renderer.or(self.renderer.take());
		self.renderer_dir = renderer_dir.or(self.renderer_dir.take());
	}

	/// Returns true if `filetype` should trigger auto-start.
	pub fn recognizes(&self, filetype: &str) -> bool {
		self.filetypes.iter().any(|known| known.eq_ignore_ascii_case(filetype))
	}

	/// Where the renderer command comes from.
	pub fn renderer_source(&self) -> RendererSource {
		match &self.renderer {
			Some(program) => {
				let mut command = RendererCommand::new(program).with_args(&self.renderer_args);
				command.working_dir = self.renderer_dir.clone();
				RendererSource::Explicit(command)
			}
			None => RendererSource::Discover {
				working_dir: self.renderer_dir.clone(),
			},
		}
	}

	/// Freezes the settings and buffer state for one launch.
	pub fn snapshot(&self, buffer: &BufferState) -> ConfigSnapshot {
		ConfigSnapshot {
			browser: self.browser.clone(),
			open_browser: self.open_browser,
			highlight_theme: self.highlight_theme.clone(),
			custom_css: self.custom_css.clone(),
			autostart: self.autostart,
			initial_text: buffer.text.clone(),
			working_dir: buffer.cwd.clone(),
			file_path: buffer.file.clone(),
		}
	}
}
