//! Transport layer for renderer communication
//!
//! Frames travel one way, editor to renderer, over one of two byte channels:
//!
//! - **Pipe**: the stdin of a renderer spawned by the supervisor, available
//!   as soon as the process exists.
//! - **Socket**: a loopback TCP connection the renderer opens back to the
//!   [`AcceptLoop`] after it starts.
//!
//! Whichever is active lives in the session's [`TransportSlot`], which holds
//! at most one connection at a time.

mod listener;


use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use composer_protocol::{FrameCodec, Request};
use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio::process::ChildStdin;
use tokio::sync::{Mutex, watch};
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, warn};

pub use listener::AcceptLoop;

use crate::error::Result;

/// Which byte channel a transport writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
	Pipe,
	Socket,
}

/// What happened to a request handed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
	/// Written to the renderer.
	Sent,
	/// Accepted by the writer task; written in issue order.
	Queued,
	/// No connection was established; the request was discarded.
	Dropped,
}

impl Delivery {
	pub fn as_str(&self) -> &'static str {
		match self {
			Delivery::Sent => "sent",
			Delivery::Queued => "queued",
			Delivery::Dropped => "dropped",
		}
	}
}

/// Capability to ship frames to the renderer.
#[async_trait]
pub trait Transport: Send {
	fn kind(&self) -> TransportKind;

	/// Encodes and writes one request, flushing before returning.
	async fn send(&mut self, request: Request) -> Result<()>;
}

/// [`Transport`] over any async writer.
pub struct FramedTransport<W> {
	kind: TransportKind,
	sink: FramedWrite<W, FrameCodec>,
}

impl<W> FramedTransport<W>
where
	W: AsyncWrite + Send + Unpin,
{
	pub fn new(kind: TransportKind, writer: W) -> Self {
		Self {
			kind,
			sink: FramedWrite::new(writer, FrameCodec),
		}
	}
}

impl FramedTransport<ChildStdin> {
	/// Transport over a spawned renderer's stdin.
	pub fn pipe(stdin: ChildStdin) -> Self {
		Self::new(TransportKind::Pipe, stdin)
	}
}

impl FramedTransport<TcpStream> {
	/// Transport over an accepted renderer connection.
	pub fn socket(stream: TcpStream) -> Self {
		if let Err(err) = stream.set_nodelay(true) {
			debug!(target = "composer.transport", error = %err, "could not disable Nagle");
		}
		Self::new(TransportKind::Socket, stream)
	}
}

#[async_trait]
impl<W> Transport for FramedTransport<W>
where
	W: AsyncWrite + Send + Unpin,
{
	fn kind(&self) -> TransportKind {
		self.kind
	}

	async fn send(&mut self, request: Request) -> Result<()> {
		self.sink.send(request).await?;
		Ok(())
	}
}

/// The session's single live connection.
///
/// Cloning shares the same slot. Writers serialize on the inner mutex; the
/// connectivity flag is published through a `watch` channel so it can be
/// read without waiting on an in-flight write.
#[derive(Clone)]
pub struct TransportSlot {
	active: Arc<Mutex<Option<Box<dyn Transport>>>>,
	connected: Arc<watch::Sender<bool>>,
	/// Number of connections installed so far.
	generation: Arc<AtomicU64>,
}

impl Default for TransportSlot {
	fn default() -> Self {
		Self::new()
	}
}

impl TransportSlot {
	pub fn new() -> Self {
		let (connected, _) = watch::channel(false);
		Self {
			active: Arc::new(Mutex::new(None)),
			connected: Arc::new(connected),
			generation: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Installs a connection, replacing any previous one.
	pub async fn install(&self, transport: Box<dyn Transport>) {
		let kind = transport.kind();
		let mut active = self.active.lock().await;
		let replaced = active.replace(transport).is_some();
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.connected.send_replace(true);

		if replaced {
			info!(target = "composer.transport", ?kind, generation, "replaced renderer connection");
		} else {
			info!(target = "composer.transport", ?kind, generation, "renderer connected");
		}
	}

	/// Drops the current connection, if any.
	pub async fn clear(&self) {
		let mut active = self.active.lock().await;
		if active.take().is_some() {
			debug!(target = "composer.transport", "renderer connection closed");
		}
		self.connected.send_replace(false);
	}

	pub fn is_connected(&self) -> bool {
		*self.connected.borrow()
	}

	/// Number of connections installed over the slot's lifetime.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::SeqCst)
	}

	/// Watches connectivity changes.
	pub fn subscribe(&self) -> watch::Receiver<bool> {
		self.connected.subscribe()
	}

	/// Writes a request to the current connection.
	///
	/// Returns [`Delivery::Dropped`] when nothing is connected. A write
	/// failure removes the broken connection before the error is returned,
	/// so later requests are dropped until a new connection is installed.
	pub async fn send(&self, request: Request) -> Result<Delivery> {
		let mut active = self.active.lock().await;
		let Some(transport) = active.as_mut() else {
			debug!(target = "composer.transport", method = %request.method, "dropping request: not connected");
			return Ok(Delivery::Dropped);
		};

		let method = request.method.clone();
		match transport.send(request).await {
			Ok(()) => Ok(Delivery::Sent),
			Err(err) => {
				if err.is_transport() {
					warn!(target = "composer.transport", %method, error = %err, "renderer connection lost");
					*active = None;
					self.connected.send_replace(false);
				}
				Err(err)
			}
		}
	}
}
