//! Codec errors.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum Error {
	/// An argument has a type the wire format does not carry.
	///
	/// Only scalars travel on the wire: null, booleans, numbers and strings.
	#[error("cannot encode argument {index} of '{method}': {kind} values are not supported")]
	UnsupportedArgument {
		method: String,
		index: usize,
		kind: &'static str,
	},

	/// MessagePack serialization failed.
	#[error("failed to encode frame: {0}")]
	Encode(#[from] rmp_serde::encode::Error),

	/// MessagePack deserialization failed.
	#[error("failed to decode frame: {0}")]
	Decode(#[from] rmp_serde::decode::Error),

	/// The frame decoded but does not have the `[method, args...]` shape.
	#[error("malformed frame: {0}")]
	MalformedFrame(String),

	/// I/O error from the underlying stream.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Returns true if the error came from the underlying stream rather than
	/// from the content of a frame.
	pub fn is_io(&self) -> bool {
		matches!(self, Error::Io(_))
	}
}
