//! Markdown Composer Runtime - renderer supervision and transports
//!
//! This crate provides the low-level plumbing between an editor and the
//! markdown renderer process:
//!
//! - **Renderer discovery**: Locating the renderer executable
//! - **Launch**: Building the renderer's invocation from a configuration snapshot
//! - **Supervisor**: Spawning the renderer at most once and tracking liveness
//! - **Transport**: Framed writes over the child's stdin or a loopback socket
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ composer     │  Session + bridge state machine
//! └──────┬───────┘
//!        │ drives
//! ┌──────▼───────┐
//! │ runtime      │  This crate
//! │  ┌────────┐  │
//! │  │ Slot   │  │  The one live connection
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Pipe/socket transport, accept loop
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Superv │  │  Process management
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod error;
pub mod launch;
pub mod renderer;
pub mod supervisor;
pub mod transport;

pub use error::{Error, Result};
pub use launch::{ConfigSnapshot, TransportHint, TransportMode, build_args};
pub use renderer::{RENDERER_BINARY, RENDERER_ENV, RendererCommand, RendererSource};
pub use supervisor::{Launch, Spawned, Supervisor};
pub use transport::{
	AcceptLoop, Delivery, FramedTransport, Transport, TransportKind, TransportSlot,
};
