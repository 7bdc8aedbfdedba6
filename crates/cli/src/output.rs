//! Line-oriented output for the host protocol.
//!
//! Every request gets exactly one envelope on stdout:
//!
//! ```json
//! {"ok":true,"op":"port","data":{"port":40123}}
//! {"ok":false,"op":"open","error":{"code":"NOT_RUNNING","message":"..."}}
//! ```
//!
//! Messages meant for the editor's status line are interleaved as
//! `{"echo":"..."}` lines.

use std::io::{self, Write};

use composer::EditorHost;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// A command needs a renderer and none was started
	NotRunning,
	/// The renderer could not be launched
	SpawnFailed,
	/// Socket or pipe failure
	Transport,
	/// Malformed request line
	InvalidInput,
	/// Configuration could not be loaded
	Config,
	/// Unknown/internal error
	Internal,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::NotRunning => write!(f, "NOT_RUNNING"),
			ErrorCode::SpawnFailed => write!(f, "SPAWN_FAILED"),
			ErrorCode::Transport => write!(f, "TRANSPORT"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::Config => write!(f, "CONFIG"),
			ErrorCode::Internal => write!(f, "INTERNAL"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Response to one host request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
	pub ok: bool,
	pub op: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl Envelope {
	pub fn success(op: &str, data: serde_json::Value) -> Self {
		Self {
			ok: true,
			op: op.to_string(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(op: &str, error: CommandError) -> Self {
		Self {
			ok: false,
			op: op.to_string(),
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Serialize)]
struct Echo<'a> {
	echo: &'a str,
}

/// Serializes JSON lines to a shared writer.
///
/// Responses come from the request loop while echoes can come from
/// background tasks; the lock keeps lines whole.
pub struct LineWriter {
	out: Mutex<Box<dyn Write + Send>>,
}

impl LineWriter {
	pub fn new(out: Box<dyn Write + Send>) -> Self {
		Self { out: Mutex::new(out) }
	}

	pub fn stdout() -> Self {
		Self::new(Box::new(io::stdout()))
	}

	/// Writes one value as a line and flushes.
	pub fn emit<T: Serialize>(&self, value: &T) {
		let json = match serde_json::to_string(value) {
			Ok(json) => json,
			Err(err) => {
				warn!(target = "composer.host", error = %err, "cannot serialize output line");
				return;
			}
		};

		let mut out = self.out.lock();
		if let Err(err) = writeln!(out, "{json}").and_then(|()| out.flush()) {
			warn!(target = "composer.host", error = %err, "cannot write output line");
		}
	}
}

impl EditorHost for LineWriter {
	fn echo(&self, message: &str) {
		self.emit(&Echo { echo: message });
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	#[derive(Clone, Default)]
	struct Shared(Arc<Mutex<Vec<u8>>>);

	impl Write for Shared {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.lock().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn failure_envelope_uses_screaming_codes() {
		let envelope = Envelope::failure(
			"open",
			CommandError {
				code: ErrorCode::NotRunning,
				message: "not running".into(),
			},
		);

		let json = serde_json::to_value(&envelope).unwrap();
		assert_eq!(json["ok"], false);
		assert_eq!(json["op"], "open");
		assert_eq!(json["error"]["code"], "NOT_RUNNING");
		assert!(json.get("data").is_none());
	}

	#[test]
	fn echo_and_responses_are_separate_lines() {
		let buffer = Shared::default();
		let writer = LineWriter::new(Box::new(buffer.clone()));

		writer.echo("renderer failed");
		writer.emit(&Envelope::success("port", serde_json::json!({ "port": null })));

		let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 2);
		assert_eq!(lines[0], r#"{"echo":"renderer failed"}"#);
		assert_eq!(lines[1], r#"{"ok":true,"op":"port","data":{"port":null}}"#);
	}

	#[test]
	fn error_code_display_matches_wire_name() {
		let wire = serde_json::to_value(ErrorCode::SpawnFailed).unwrap();
		assert_eq!(wire, ErrorCode::SpawnFailed.to_string());
	}
}
