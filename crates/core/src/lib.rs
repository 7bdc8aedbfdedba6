//! composer: live markdown previews driven from an editor
//!
//! This crate is the editor side of the markdown-composer bridge. It turns
//! editor lifecycle events into a renderer process and a stream of frames:
//!
//! ```text
//! editor events ─▶ Bridge ─▶ Session ─▶ Supervisor (spawn once)
//!                               │
//!                               └────▶ TransportSlot ─▶ renderer
//! ```
//!
//! Sends are best effort. Until the renderer is connected, buffer updates
//! are dropped rather than queued: every update carries the full buffer, so
//! the next one after connecting brings the preview up to date.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use composer::{Bridge, BufferState, ComposerConfig, EditorEvent, LogHost};
//!
//! #[tokio::main]
//! async fn main() -> composer::Result<()> {
//!     let config = ComposerConfig::load_default()?;
//!     let bridge = Bridge::new(config, Arc::new(LogHost));
//!
//!     bridge.handle_event(EditorEvent::DocumentRecognized {
//!         filetype: "markdown".into(),
//!         buffer: BufferState::new("# Notes"),
//!     });
//!     bridge.handle_event(EditorEvent::BufferModified { text: "# Notes\n\nmore".into() });
//!
//!     bridge.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod session;

pub use bridge::{Bridge, EventOutcome};
pub use composer_protocol::Request;
pub use composer_runtime::{ConfigSnapshot, Delivery, RendererCommand, RendererSource, TransportMode};
pub use config::{ComposerConfig, ConfigOverrides};
pub use error::{Error, Result};
pub use host::{BufferState, EditorEvent, EditorHost, LogHost};
pub use session::{BridgeState, Session, StartOutcome, StartTrigger};
