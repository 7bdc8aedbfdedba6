//! Editor host protocol.
//!
//! An editor plugin drives the bridge by writing one JSON request per line
//! to stdin and reading one [`Envelope`] per request from stdout:
//!
//! ```text
//! → {"op":"filetype","filetype":"markdown","text":"# Notes","cwd":"/home/me/notes"}
//! ← {"ok":true,"op":"filetype","data":{"outcome":"starting"}}
//! → {"op":"changed","text":"# Notes\n\nmore"}
//! ← {"ok":true,"op":"changed","data":{"delivery":"queued"}}
//! → {"op":"port"}
//! ← {"ok":true,"op":"port","data":{"port":40123}}
//! ```
//!
//! `quit` or end of input tears the session down.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use composer::{
	Bridge, BufferState, ComposerConfig, EditorEvent, EditorHost, EventOutcome, StartTrigger,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error};

use crate::error::{CliError, Result};
use crate::output::{Envelope, LineWriter};

const DEFAULT_WAIT_MS: u64 = 5_000;

fn default_wait_ms() -> u64 {
	DEFAULT_WAIT_MS
}

/// One request line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HostRequest {
	/// Manual start.
	Start {
		#[serde(default)]
		text: String,
		cwd: Option<PathBuf>,
		file: Option<PathBuf>,
	},
	/// Document type recognized; auto-starts when configured.
	Filetype {
		filetype: String,
		#[serde(default)]
		text: String,
		cwd: Option<PathBuf>,
		file: Option<PathBuf>,
	},
	/// Buffer modified.
	Changed { text: String },
	/// Synchronous update; answered after the frame is written.
	Update { text: String },
	Open,
	Port,
	/// Buffer entered.
	Enter { path: PathBuf },
	/// Active file changed.
	FileChanged { path: PathBuf },
	/// Working directory changed.
	Chdir { dir: PathBuf },
	/// Waits for the renderer to connect.
	Wait {
		#[serde(default = "default_wait_ms")]
		timeout_ms: u64,
	},
	State,
	Quit,
}

impl HostRequest {
	pub fn op(&self) -> &'static str {
		match self {
			HostRequest::Start { .. } => "start",
			HostRequest::Filetype { .. } => "filetype",
			HostRequest::Changed { .. } => "changed",
			HostRequest::Update { .. } => "update",
			HostRequest::Open => "open",
			HostRequest::Port => "port",
			HostRequest::Enter { .. } => "enter",
			HostRequest::FileChanged { .. } => "file_changed",
			HostRequest::Chdir { .. } => "chdir",
			HostRequest::Wait { .. } => "wait",
			HostRequest::State => "state",
			HostRequest::Quit => "quit",
		}
	}
}

/// Runs the host protocol on stdin/stdout until `quit` or EOF.
pub async fn execute(config: ComposerConfig) -> Result<()> {
	let out = Arc::new(LineWriter::stdout());
	let bridge = Bridge::new(config, Arc::clone(&out) as Arc<dyn EditorHost>);

	serve(&bridge, BufReader::new(tokio::io::stdin()), &out).await;
	bridge.shutdown().await;
	Ok(())
}

/// Answers requests read from `reader` until `quit` or EOF.
pub async fn serve<R>(bridge: &Bridge, mut reader: R, out: &LineWriter)
where
	R: AsyncBufRead + Unpin,
{
	let mut line = String::new();

	loop {
		line.clear();
		match reader.read_line(&mut line).await {
			Ok(0) => {
				debug!(target = "composer.host", "input closed");
				break;
			}
			Ok(_) => {}
			Err(err) => {
				error!(target = "composer.host", error = %err, "stdin read failed");
				break;
			}
		}

		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}

		let request: HostRequest = match serde_json::from_str(trimmed) {
			Ok(request) => request,
			Err(err) => {
				let err = CliError::InvalidInput(err.to_string());
				out.emit(&Envelope::failure("unknown", err.to_command_error()));
				continue;
			}
		};

		let op = request.op();
		if request == HostRequest::Quit {
			out.emit(&Envelope::success(op, Value::Null));
			break;
		}

		let envelope = match handle(bridge, request).await {
			Ok(data) => Envelope::success(op, data),
			Err(err) => Envelope::failure(op, err.to_command_error()),
		};
		out.emit(&envelope);
	}
}

async fn handle(bridge: &Bridge, request: HostRequest) -> Result<Value> {
	let data = match request {
		HostRequest::Start { text, cwd, file } => {
			let outcome = bridge.start(buffer(text, cwd, file), StartTrigger::Manual)?;
			json!({ "outcome": outcome.as_str(), "port": bridge.port() })
		}
		HostRequest::Filetype {
			filetype,
			text,
			cwd,
			file,
		} => event_data(bridge.handle_event(EditorEvent::DocumentRecognized {
			filetype,
			buffer: buffer(text, cwd, file),
		})),
		HostRequest::Changed { text } => {
			event_data(bridge.handle_event(EditorEvent::BufferModified { text }))
		}
		HostRequest::Update { text } => {
			let delivery = bridge.update(text).await?;
			json!({ "delivery": delivery.as_str() })
		}
		HostRequest::Open => {
			let delivery = bridge.open_browser()?;
			json!({ "delivery": delivery.as_str() })
		}
		HostRequest::Port => json!({ "port": bridge.port() }),
		HostRequest::Enter { path } => {
			event_data(bridge.handle_event(EditorEvent::BufferEntered { path }))
		}
		HostRequest::FileChanged { path } => {
			event_data(bridge.handle_event(EditorEvent::ActiveFileChanged { path }))
		}
		HostRequest::Chdir { dir } => {
			event_data(bridge.handle_event(EditorEvent::DirectoryChanged { dir }))
		}
		HostRequest::Wait { timeout_ms } => {
			let connected = bridge.wait_connected(Duration::from_millis(timeout_ms)).await;
			json!({ "connected": connected })
		}
		HostRequest::State => json!({
			"state": bridge.state().as_str(),
			"port": bridge.port(),
			"pid": bridge.session().renderer_pid(),
		}),
		HostRequest::Quit => Value::Null,
	};
	Ok(data)
}

fn buffer(text: String, cwd: Option<PathBuf>, file: Option<PathBuf>) -> BufferState {
	BufferState { text, cwd, file }
}

fn event_data(outcome: EventOutcome) -> Value {
	match outcome {
		EventOutcome::Started(outcome) => json!({ "outcome": outcome.as_str() }),
		EventOutcome::Delivered(delivery) => json!({ "delivery": delivery.as_str() }),
		EventOutcome::Ignored => json!({ "outcome": "ignored" }),
	}
}
