//! Renderer process management
//!
//! Spawns the renderer at most once per session and tracks whether it is
//! still alive. Liveness is checked lazily (`try_wait`) whenever the
//! supervisor is consulted; an exited process is reaped and forgotten so the
//! next start request can launch a fresh one.


use std::ffi::OsString;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::launch::{ConfigSnapshot, TransportHint, build_args};
use crate::renderer::RendererCommand;

/// A tracked renderer process.
#[derive(Debug)]
struct RendererProcess {
	child: Child,
	pid: Option<u32>,
	invocation: Vec<OsString>,
}

impl RendererProcess {
	fn is_alive(&mut self) -> bool {
		match self.child.try_wait() {
			Ok(None) => true,
			Ok(Some(status)) => {
				info!(target = "composer.supervisor", pid = ?self.pid, %status, "renderer exited");
				false
			}
			Err(err) => {
				warn!(target = "composer.supervisor", pid = ?self.pid, error = %err, "cannot query renderer status");
				false
			}
		}
	}
}

/// Result of a start request.
#[derive(Debug)]
pub enum Launch {
	/// A new process was spawned.
	Spawned(Spawned),
	/// A live process already exists; nothing was done.
	AlreadyRunning,
}

/// Handles produced by a fresh spawn.
#[derive(Debug)]
pub struct Spawned {
	pub pid: Option<u32>,
	/// The renderer's stdin, present in pipe-mode.
	pub stdin: Option<ChildStdin>,
}

/// Owns the lifecycle of the renderer process.
#[derive(Debug, Default)]
pub struct Supervisor {
	process: Mutex<Option<RendererProcess>>,
	launches: AtomicUsize,
}

impl Supervisor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Spawns the renderer unless a live one is already tracked.
	///
	/// Must be called from within a tokio runtime. A failed spawn is not
	/// retried; the supervisor is left without a process.
	///
	/// # Errors
	///
	/// Returns [`Error::SpawnFailed`] if the process cannot be launched.
	pub fn ensure_started(
		&self,
		command: &RendererCommand,
		snapshot: &ConfigSnapshot,
		hint: &TransportHint,
	) -> Result<Launch> {
		let mut process = self.process.lock();
		if let Some(existing) = process.as_mut() {
			if existing.is_alive() {
				debug!(target = "composer.supervisor", pid = ?existing.pid, "renderer already running");
				return Ok(Launch::AlreadyRunning);
			}
			*process = None;
		}

		let invocation = build_args(snapshot, hint);
		let stdin = match hint {
			TransportHint::Pipe => Stdio::piped(),
			TransportHint::Listen { .. } => Stdio::null(),
		};

		let mut cmd = Command::new(&command.program);
		cmd.args(&command.base_args)
			.args(&invocation)
			.stdin(stdin)
			.stdout(Stdio::null())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);
		if let Some(dir) = &command.working_dir {
			cmd.current_dir(dir);
		}

		let mut child = cmd.spawn().map_err(|e| {
			Error::SpawnFailed(format!("{}: {}", command.program.display(), e))
		})?;

		let pid = child.id();
		let stdin = child.stdin.take();
		self.launches.fetch_add(1, Ordering::SeqCst);
		info!(
			target = "composer.supervisor",
			program = %command.program.display(),
			pid = ?pid,
			mode = %hint.mode(),
			"renderer started"
		);

		*process = Some(RendererProcess {
			child,
			pid,
			invocation,
		});

		Ok(Launch::Spawned(Spawned { pid, stdin }))
	}

	/// Returns true if a tracked process is still alive.
	pub fn is_running(&self) -> bool {
		let mut process = self.process.lock();
		let alive = process.as_mut().is_some_and(RendererProcess::is_alive);
		if !alive {
			*process = None;
		}
		alive
	}

	/// Process id of the live renderer.
	pub fn pid(&self) -> Option<u32> {
		self.process.lock().as_ref().and_then(|p| p.pid)
	}

	/// Arguments the live renderer was launched with (after the base args).
	pub fn invocation(&self) -> Option<Vec<OsString>> {
		self.process.lock().as_ref().map(|p| p.invocation.clone())
	}

	/// Number of processes spawned over the supervisor's lifetime.
	pub fn launch_count(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}

	/// Stops the renderer.
	///
	/// Waits up to `grace` for the process to exit on its own (its transport
	/// should already be closed), then kills it.
	pub async fn shutdown(&self, grace: Duration) -> Result<()> {
		let taken = self.process.lock().take();
		let Some(mut process) = taken else {
			return Ok(());
		};

		if let Ok(status) = tokio::time::timeout(grace, process.child.wait()).await {
			let status = status?;
			debug!(target = "composer.supervisor", pid = ?process.pid, %status, "renderer exited on close");
			return Ok(());
		}

		process.child.kill().await?;
		info!(target = "composer.supervisor", pid = ?process.pid, "renderer killed");
		Ok(())
	}
}
