//! Error types for the bridge.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the editor collaborator.
///
/// None of these are fatal to the editor: each concerns one request or one
/// start attempt.
#[derive(Debug, Error)]
pub enum Error {
	/// A command needs a renderer but none was ever started.
	#[error("markdown preview is not running. Start it first")]
	NotRunning,

	/// The session was shut down and its writer is gone.
	#[error("markdown preview session is closed")]
	SessionClosed,

	/// Configuration file could not be read.
	#[error("failed to read config {path}: {source}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Configuration file is not valid JSON for [`crate::ComposerConfig`].
	#[error("invalid config {path}: {source}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// Spawn, transport, or encoding failure from the runtime.
	#[error(transparent)]
	Runtime(#[from] composer_runtime::Error),
}
