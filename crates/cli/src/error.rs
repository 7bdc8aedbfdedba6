use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid request: {0}")]
	InvalidInput(String),

	#[error(transparent)]
	Bridge(#[from] composer::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Bridge(err) => match err {
				composer::Error::NotRunning => ErrorCode::NotRunning,
				composer::Error::ConfigRead { .. } | composer::Error::ConfigParse { .. } => {
					ErrorCode::Config
				}
				composer::Error::Runtime(runtime) => runtime_code(runtime),
				composer::Error::SessionClosed => ErrorCode::Internal,
			},
			CliError::Io(_) => ErrorCode::Internal,
		}
	}

	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		CommandError {
			code: self.code(),
			message: self.to_string(),
		}
	}
}

fn runtime_code(err: &composer_runtime::Error) -> ErrorCode {
	use composer_runtime::Error;

	match err {
		Error::RendererNotFound | Error::SpawnFailed(_) => ErrorCode::SpawnFailed,
		Error::Bind(_) | Error::TransportWrite(_) | Error::Io(_) => ErrorCode::Transport,
		Error::Encoding(_) => ErrorCode::InvalidInput,
	}
}
