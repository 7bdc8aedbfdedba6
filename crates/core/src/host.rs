//! The editor collaborator's side of the bridge.

use std::path::{Path, PathBuf};

use tracing::info;

/// Output the bridge needs from the editor.
///
/// Implementations must not block: they are called from request handlers
/// and from background tasks.
pub trait EditorHost: Send + Sync {
	/// Shows a one-line message to the user.
	fn echo(&self, message: &str);
}

/// Host that only logs. Useful when no editor UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHost;

impl EditorHost for LogHost {
	fn echo(&self, message: &str) {
		info!(target = "composer.host", "{message}");
	}
}

/// Buffer state captured when the bridge starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferState {
	/// Full buffer text.
	pub text: String,
	/// Editor working directory.
	pub cwd: Option<PathBuf>,
	/// File backing the buffer; `None` for unnamed buffers.
	pub file: Option<PathBuf>,
}

impl BufferState {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			..Default::default()
		}
	}

	pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}

	pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
		self.file = Some(file.into());
		self
	}
}

/// Lifecycle events the editor forwards to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
	/// A buffer's document type was detected; candidate for auto-start.
	DocumentRecognized { filetype: String, buffer: BufferState },
	/// Buffer content changed; candidate for `send_data`.
	BufferModified { text: String },
	/// The active file changed; candidate for `chdir`.
	ActiveFileChanged { path: PathBuf },
	/// A buffer was entered; candidate for `chdir`.
	BufferEntered { path: PathBuf },
	/// The editor's working directory changed.
	DirectoryChanged { dir: PathBuf },
}

impl EditorEvent {
	/// Directory a `chdir` should point at, for events that carry one.
	///
	/// File events resolve to the file's parent directory.
	pub fn directory(&self) -> Option<&Path> {
		match self {
			EditorEvent::ActiveFileChanged { path } | EditorEvent::BufferEntered { path } => {
				path.parent().filter(|dir| !dir.as_os_str().is_empty())
			}
			EditorEvent::DirectoryChanged { dir } => Some(dir),
			_ => None,
		}
	}
}
