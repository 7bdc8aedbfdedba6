//! Listen-mode accept loop.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{FramedTransport, TransportSlot};
use crate::error::{Error, Result};

/// Loopback listener whose accepted connections feed a [`TransportSlot`].
///
/// Every accepted connection replaces the previous one, so a restarted
/// renderer reconnects without any teardown message. Dropping the loop
/// cancels the background task and closes the listening socket.
pub struct AcceptLoop {
	port: u16,
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl AcceptLoop {
	/// Binds an ephemeral loopback port (backlog 1) and starts accepting.
	///
	/// Must be called from within a tokio runtime.
	///
	/// # Errors
	///
	/// Returns [`Error::Bind`] if the socket cannot be opened.
	pub fn bind(slot: TransportSlot) -> Result<Self> {
		let listener = bind_loopback().map_err(Error::Bind)?;
		let port = listener.local_addr().map_err(Error::Bind)?.port();
		info!(target = "composer.transport", port, "listening for renderer");

		let cancel = CancellationToken::new();
		let task = tokio::spawn(accept_loop(listener, slot, cancel.clone()));

		Ok(Self {
			port,
			cancel,
			task: Some(task),
		})
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	/// Stops accepting and waits for the loop to exit.
	pub async fn shutdown(mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl Drop for AcceptLoop {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

fn bind_loopback() -> std::io::Result<TcpListener> {
	let socket = TcpSocket::new_v4()?;
	socket.bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))?;
	socket.listen(1)
}

async fn accept_loop(listener: TcpListener, slot: TransportSlot, cancel: CancellationToken) {
	loop {
		tokio::select! {
			_ = cancel.cancelled() => {
				debug!(target = "composer.transport", "accept loop cancelled");
				break;
			}
			accepted = listener.accept() => match accepted {
				Ok((stream, peer)) => {
					debug!(target = "composer.transport", %peer, "accepted renderer connection");
					slot.install(Box::new(FramedTransport::socket(stream))).await;
				}
				Err(err) => {
					warn!(target = "composer.transport", error = %err, "accept failed");
					tokio::time::sleep(std::time::Duration::from_millis(50)).await;
				}
			}
		}
	}
}
