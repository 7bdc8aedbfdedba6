//! The bridge session.
//!
//! One [`Session`] exists per editor. It owns the renderer process, the
//! single transport slot and, in listen-mode, the accept loop. Editor-facing
//! calls never wait on renderer I/O: starts run on a background task and
//! writes go through a single writer task that preserves issue order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use composer_protocol::Request;
use composer_runtime::{
	AcceptLoop, ConfigSnapshot, Delivery, FramedTransport, Launch, RendererSource, Supervisor,
	TransportHint, TransportMode, TransportSlot,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::host::EditorHost;

/// How long a renderer gets to exit on its own once its transport is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Observable bridge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
	/// No renderer and no connection.
	Idle,
	/// A renderer was launched but has not connected yet.
	Starting,
	/// A transport is established.
	Connected,
}

impl BridgeState {
	pub fn as_str(&self) -> &'static str {
		match self {
			BridgeState::Idle => "idle",
			BridgeState::Starting => "starting",
			BridgeState::Connected => "connected",
		}
	}
}

impl std::fmt::Display for BridgeState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What asked for a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTrigger {
	/// A recognized document type.
	Auto,
	/// An explicit user command.
	Manual,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
	/// A launch was scheduled.
	Starting,
	/// A renderer is already starting or connected; nothing was done.
	AlreadyStarted,
	/// An automatic start after a failed spawn; only a manual start retries.
	Skipped,
}

impl StartOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			StartOutcome::Starting => "starting",
			StartOutcome::AlreadyStarted => "already_started",
			StartOutcome::Skipped => "skipped",
		}
	}
}

/// Launch bookkeeping. The public [`BridgeState`] is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Idle,
	InFlight,
	Running,
	Failed,
}

struct Outbound {
	request: Request,
	ack: Option<oneshot::Sender<Result<Delivery>>>,
}

/// Bridge session shared between the editor and background tasks.
pub struct Session {
	mode: TransportMode,
	runtime: Handle,
	supervisor: Arc<Supervisor>,
	slot: TransportSlot,
	phase: Arc<Mutex<Phase>>,
	acceptor: Mutex<Option<AcceptLoop>>,
	launch: Mutex<Option<JoinHandle<()>>>,
	cwd_hint: Mutex<Option<PathBuf>>,
	outbound: mpsc::UnboundedSender<Outbound>,
	host: Arc<dyn EditorHost>,
}

impl Session {
	/// Creates an idle session and its writer task.
	///
	/// Must be called from within a tokio runtime; background work runs on
	/// that runtime even when later calls come from other threads.
	pub fn new(mode: TransportMode, host: Arc<dyn EditorHost>) -> Self {
		Self::with_runtime(Handle::current(), mode, host)
	}

	/// Creates an idle session whose background work runs on `runtime`.
	pub fn with_runtime(runtime: Handle, mode: TransportMode, host: Arc<dyn EditorHost>) -> Self {
		let slot = TransportSlot::new();
		let supervisor = Arc::new(Supervisor::new());
		let (outbound, rx) = mpsc::unbounded_channel();
		runtime.spawn(write_loop(WriterTask {
			mode,
			slot: slot.clone(),
			supervisor: Arc::clone(&supervisor),
			host: Arc::clone(&host),
			rx,
		}));

		Self {
			mode,
			runtime,
			supervisor,
			slot,
			phase: Arc::new(Mutex::new(Phase::Idle)),
			acceptor: Mutex::new(None),
			launch: Mutex::new(None),
			cwd_hint: Mutex::new(None),
			outbound,
			host,
		}
	}

	pub fn mode(&self) -> TransportMode {
		self.mode
	}

	pub fn state(&self) -> BridgeState {
		derive_state(self.mode, *self.phase.lock(), &self.slot, &self.supervisor)
	}

	/// Starts the renderer unless one is already starting or connected.
	///
	/// Returns as soon as the launch is scheduled. Spawn failures are
	/// reported through the [`EditorHost`] and leave the session idle.
	///
	/// # Errors
	///
	/// Returns an error if the listen-mode socket cannot be bound.
	pub fn start(
		&self,
		source: RendererSource,
		snapshot: ConfigSnapshot,
		trigger: StartTrigger,
	) -> Result<StartOutcome> {
		let mut phase = self.phase.lock();
		if derive_state(self.mode, *phase, &self.slot, &self.supervisor) != BridgeState::Idle {
			debug!(target = "composer.session", ?trigger, "start ignored: already started");
			return Ok(StartOutcome::AlreadyStarted);
		}
		if *phase == Phase::Failed && trigger == StartTrigger::Auto {
			debug!(target = "composer.session", "auto start skipped after failed spawn");
			return Ok(StartOutcome::Skipped);
		}

		let hint = match self.mode {
			TransportMode::Listen => match self.ensure_listener() {
				Ok(port) => TransportHint::Listen { port },
				Err(err) => {
					*phase = Phase::Failed;
					return Err(err);
				}
			},
			TransportMode::Pipe => TransportHint::Pipe,
		};

		*phase = Phase::InFlight;
		drop(phase);

		info!(target = "composer.session", ?trigger, mode = %self.mode, "starting renderer");
		let task = self.runtime.spawn(launch_renderer(LaunchTask {
			supervisor: Arc::clone(&self.supervisor),
			slot: self.slot.clone(),
			phase: Arc::clone(&self.phase),
			host: Arc::clone(&self.host),
			source,
			snapshot,
			hint,
		}));
		*self.launch.lock() = Some(task);

		Ok(StartOutcome::Starting)
	}

	/// Binds the accept loop on first use; later calls reuse its port.
	fn ensure_listener(&self) -> Result<u16> {
		let mut acceptor = self.acceptor.lock();
		if let Some(existing) = acceptor.as_ref() {
			return Ok(existing.port());
		}

		let _guard = self.runtime.enter();
		let bound = AcceptLoop::bind(self.slot.clone())?;
		let port = bound.port();
		*acceptor = Some(bound);
		Ok(port)
	}

	/// Queues a request without waiting for it to be written.
	///
	/// Dropped unless a transport is established right now.
	pub fn enqueue(&self, request: Request) -> Delivery {
		if !self.slot.is_connected() {
			debug!(target = "composer.session", method = %request.method, "dropping request: not connected");
			return Delivery::Dropped;
		}

		match self.outbound.send(Outbound { request, ack: None }) {
			Ok(()) => Delivery::Queued,
			Err(_) => Delivery::Dropped,
		}
	}

	/// Sends a request and waits until it has been written.
	///
	/// Requests queued earlier are written first.
	///
	/// # Errors
	///
	/// Returns the write error if the transport broke, or
	/// [`Error::SessionClosed`] if the writer is gone.
	pub async fn deliver(&self, request: Request) -> Result<Delivery> {
		if !self.slot.is_connected() {
			debug!(target = "composer.session", method = %request.method, "dropping request: not connected");
			return Ok(Delivery::Dropped);
		}

		let (ack, done) = oneshot::channel();
		self.outbound
			.send(Outbound {
				request,
				ack: Some(ack),
			})
			.map_err(|_| Error::SessionClosed)?;
		done.await.map_err(|_| Error::SessionClosed)?
	}

	/// Port the accept loop is bound to, once listen-mode has started.
	pub fn port(&self) -> Option<u16> {
		self.acceptor.lock().as_ref().map(AcceptLoop::port)
	}

	pub fn set_cwd_hint(&self, dir: impl Into<PathBuf>) {
		*self.cwd_hint.lock() = Some(dir.into());
	}

	/// Last directory the editor moved to.
	pub fn cwd_hint(&self) -> Option<PathBuf> {
		self.cwd_hint.lock().clone()
	}

	/// Number of renderer processes launched by this session.
	pub fn launch_count(&self) -> usize {
		self.supervisor.launch_count()
	}

	/// Process id of the live renderer.
	pub fn renderer_pid(&self) -> Option<u32> {
		self.supervisor.pid()
	}

	/// Waits until a transport is established, or `timeout` elapses.
	pub async fn wait_connected(&self, timeout: Duration) -> bool {
		let mut connected = self.slot.subscribe();
		matches!(
			tokio::time::timeout(timeout, connected.wait_for(|up| *up)).await,
			Ok(Ok(_))
		)
	}

	/// Tears the session down locally: stops accepting, closes the
	/// transport, then stops the renderer.
	///
	/// A launch still in flight is allowed to finish first so the process it
	/// spawns is stopped too.
	pub async fn shutdown(&self) {
		let launch = self.launch.lock().take();
		if let Some(launch) = launch {
			if let Err(err) = launch.await {
				warn!(target = "composer.session", error = %err, "launch task failed");
			}
		}

		let acceptor = self.acceptor.lock().take();
		if let Some(acceptor) = acceptor {
			acceptor.shutdown().await;
		}
		self.slot.clear().await;

		if let Err(err) = self.supervisor.shutdown(SHUTDOWN_GRACE).await {
			warn!(target = "composer.session", error = %err, "renderer shutdown failed");
		}
		*self.phase.lock() = Phase::Idle;
		info!(target = "composer.session", "session closed");
	}
}

fn derive_state(
	mode: TransportMode,
	phase: Phase,
	slot: &TransportSlot,
	supervisor: &Supervisor,
) -> BridgeState {
	if slot.is_connected() {
		return BridgeState::Connected;
	}
	// A pipe is attached at spawn and never comes back once it breaks.
	match phase {
		Phase::InFlight => BridgeState::Starting,
		Phase::Running if mode == TransportMode::Listen && supervisor.is_running() => {
			BridgeState::Starting
		}
		Phase::Running | Phase::Idle | Phase::Failed => BridgeState::Idle,
	}
}

struct LaunchTask {
	supervisor: Arc<Supervisor>,
	slot: TransportSlot,
	phase: Arc<Mutex<Phase>>,
	host: Arc<dyn EditorHost>,
	source: RendererSource,
	snapshot: ConfigSnapshot,
	hint: TransportHint,
}

async fn launch_renderer(task: LaunchTask) {
	let LaunchTask {
		supervisor,
		slot,
		phase,
		host,
		source,
		snapshot,
		hint,
	} = task;

	if matches!(hint, TransportHint::Pipe) && supervisor.is_running() {
		debug!(target = "composer.session", "replacing renderer whose pipe is gone");
		if let Err(err) = supervisor.shutdown(Duration::ZERO).await {
			warn!(target = "composer.session", error = %err, "stale renderer not stopped");
		}
	}

	let launched = source
		.resolve()
		.and_then(|command| supervisor.ensure_started(&command, &snapshot, &hint));

	match launched {
		Ok(Launch::Spawned(spawned)) => {
			if let Some(stdin) = spawned.stdin {
				slot.install(Box::new(FramedTransport::pipe(stdin))).await;
			}
			*phase.lock() = Phase::Running;
		}
		Ok(Launch::AlreadyRunning) => {
			*phase.lock() = Phase::Running;
		}
		Err(err) => {
			*phase.lock() = Phase::Failed;
			error!(target = "composer.session", error = %err, "renderer failed to start");
			host.echo(&format!("markdown-composer: {err}"));
		}
	}
}

struct WriterTask {
	mode: TransportMode,
	slot: TransportSlot,
	supervisor: Arc<Supervisor>,
	host: Arc<dyn EditorHost>,
	rx: mpsc::UnboundedReceiver<Outbound>,
}

async fn write_loop(task: WriterTask) {
	let WriterTask {
		mode,
		slot,
		supervisor,
		host,
		mut rx,
	} = task;

	while let Some(Outbound { request, ack }) = rx.recv().await {
		let method = request.method.clone();
		let result = slot.send(request).await;

		let broken = matches!(&result, Err(err) if err.is_transport());
		if broken && mode == TransportMode::Pipe {
			info!(target = "composer.session", "renderer pipe closed; stopping renderer");
			if let Err(err) = supervisor.shutdown(Duration::ZERO).await {
				warn!(target = "composer.session", error = %err, "renderer shutdown failed");
			}
		}
		let result = result.map_err(Error::from);

		match ack {
			Some(ack) => {
				let _ = ack.send(result);
			}
			None => {
				if let Err(err) = result {
					warn!(target = "composer.session", %method, error = %err, "request not delivered");
					host.echo(&format!("markdown-composer: {err}"));
				}
			}
		}
	}
	debug!(target = "composer.session", "writer stopped");
}
