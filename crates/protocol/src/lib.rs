//! Wire types for the markdown-composer bridge.
//!
//! The editor side ships discrete requests to the renderer process. Each
//! request is a single MessagePack array, `[method, arg0, arg1, ...]`, written
//! back to back over a byte stream (a child's stdin or a loopback socket).
//! There are no request ids and no replies: every frame is a notification.
//!
//! - [`Request`]: a method name plus positional arguments
//! - [`encode`] / [`decode`]: one frame to and from bytes
//! - [`FrameCodec`]: streaming framing for `tokio_util::codec`

mod codec;
mod error;
mod request;

pub use codec::{FrameCodec, decode, encode};
pub use error::{Error, Result};
pub use request::{Request, method};
