//! Error types for the composer runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while supervising or talking to the renderer.
#[derive(Debug, Error)]
pub enum Error {
	/// Renderer executable was not found.
	#[error(
		"markdown renderer not found. Install markdown-composer or set COMPOSER_RENDERER"
	)]
	RendererNotFound,

	/// Failed to launch the renderer process.
	#[error("Failed to launch markdown renderer: {0}")]
	SpawnFailed(String),

	/// Failed to open the loopback listening socket.
	#[error("Failed to bind renderer socket: {0}")]
	Bind(#[source] std::io::Error),

	/// Writing to the renderer failed (broken pipe, reset connection).
	#[error("Transport error: {0}")]
	TransportWrite(#[source] std::io::Error),

	/// A request could not be encoded.
	#[error(transparent)]
	Encoding(composer_protocol::Error),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Returns true if the connection this error came from is unusable.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::TransportWrite(_))
	}

	/// Returns true if the renderer could not be started.
	pub fn is_spawn(&self) -> bool {
		matches!(self, Error::RendererNotFound | Error::SpawnFailed(_))
	}
}

impl From<composer_protocol::Error> for Error {
	/// Stream failures surfacing through the codec are transport errors; the
	/// rest concern a single frame.
	fn from(err: composer_protocol::Error) -> Self {
		match err {
			composer_protocol::Error::Io(io) => Error::TransportWrite(io),
			other => Error::Encoding(other),
		}
	}
}
