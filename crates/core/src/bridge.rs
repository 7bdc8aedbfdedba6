//! Editor-facing bridge controller.
//!
//! Maps editor lifecycle events onto the [`Session`] and exposes the
//! commands an editor binds: start, update, open, port.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use composer_protocol::Request;
use composer_runtime::Delivery;
use tracing::debug;

use crate::config::ComposerConfig;
use crate::error::{Error, Result};
use crate::host::{BufferState, EditorEvent, EditorHost};
use crate::session::{BridgeState, Session, StartOutcome, StartTrigger};

/// What an editor event led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
	Started(StartOutcome),
	Delivered(Delivery),
	/// The event needs no action (unrecognized document, autostart off).
	Ignored,
}

/// Drives one [`Session`] from editor events and commands.
pub struct Bridge {
	session: Arc<Session>,
	config: ComposerConfig,
	host: Arc<dyn EditorHost>,
}

impl Bridge {
	/// Creates a bridge with an idle session.
	///
	/// Must be called from within a tokio runtime.
	pub fn new(config: ComposerConfig, host: Arc<dyn EditorHost>) -> Self {
		let session = Arc::new(Session::new(config.transport, Arc::clone(&host)));
		Self {
			session,
			config,
			host,
		}
	}

	pub fn config(&self) -> &ComposerConfig {
		&self.config
	}

	pub fn session(&self) -> &Arc<Session> {
		&self.session
	}

	pub fn state(&self) -> BridgeState {
		self.session.state()
	}

	/// Active listen-mode port; `None` in pipe-mode or before the first start.
	pub fn port(&self) -> Option<u16> {
		self.session.port()
	}

	/// Routes a lifecycle event.
	///
	/// Never fails: start errors are echoed to the host and reported as
	/// [`EventOutcome::Ignored`].
	pub fn handle_event(&self, event: EditorEvent) -> EventOutcome {
		match event {
			EditorEvent::DocumentRecognized { filetype, buffer } => {
				if !self.config.autostart || !self.config.recognizes(&filetype) {
					debug!(target = "composer.session", %filetype, "document not eligible for auto start");
					return EventOutcome::Ignored;
				}
				match self.start(buffer, StartTrigger::Auto) {
					Ok(outcome) => EventOutcome::Started(outcome),
					Err(err) => {
						self.host.echo(&format!("markdown-composer: {err}"));
						EventOutcome::Ignored
					}
				}
			}
			EditorEvent::BufferModified { text } => EventOutcome::Delivered(self.buffer_changed(text)),
			other => match other.directory() {
				Some(dir) => EventOutcome::Delivered(self.change_directory(dir)),
				None => EventOutcome::Ignored,
			},
		}
	}

	/// Starts the renderer for `buffer`. Idempotent.
	///
	/// When the buffer carries no working directory, the last directory the
	/// editor moved to is used instead.
	pub fn start(&self, mut buffer: BufferState, trigger: StartTrigger) -> Result<StartOutcome> {
		if buffer.cwd.is_none() {
			buffer.cwd = self.session.cwd_hint();
		}
		let snapshot = self.config.snapshot(&buffer);
		self.session.start(self.config.renderer_source(), snapshot, trigger)
	}

	/// Fire-and-forget `send_data` with the full buffer text.
	pub fn buffer_changed(&self, text: impl Into<String>) -> Delivery {
		self.session.enqueue(Request::send_data(text))
	}

	/// `send_data` that returns once the frame has been written.
	pub async fn update(&self, text: impl Into<String>) -> Result<Delivery> {
		self.session.deliver(Request::send_data(text)).await
	}

	/// Records `dir` as the working directory and sends `chdir`.
	pub fn change_directory(&self, dir: &Path) -> Delivery {
		self.session.set_cwd_hint(dir);
		self.session.enqueue(Request::chdir(dir))
	}

	/// Asks the renderer to show a browser view.
	///
	/// # Errors
	///
	/// Returns [`Error::NotRunning`] when no renderer was started. While one
	/// is still starting the request is dropped like any other.
	pub fn open_browser(&self) -> Result<Delivery> {
		match self.session.state() {
			BridgeState::Idle => Err(Error::NotRunning),
			BridgeState::Starting | BridgeState::Connected => {
				Ok(self.session.enqueue(Request::open_browser()))
			}
		}
	}

	pub async fn wait_connected(&self, timeout: Duration) -> bool {
		self.session.wait_connected(timeout).await
	}

	pub async fn shutdown(&self) {
		self.session.shutdown().await;
	}
}
