//! Outbound requests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names understood by the renderer.
pub mod method {
	/// Replace the previewed content: `[text]`.
	pub const SEND_DATA: &str = "send_data";
	/// Open or focus a browser on the preview: `[]`.
	pub const OPEN_BROWSER: &str = "open_browser";
	/// Serve static assets relative to a directory: `[path]`.
	pub const CHDIR: &str = "chdir";
}

/// A method call addressed to the renderer.
///
/// The catalogue is open: any `(method, args)` pair can be framed. The
/// constructors cover the methods the renderer currently understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Method name, always the first element of the frame.
	pub method: String,
	/// Positional arguments in call order.
	pub args: Vec<Value>,
}

impl Request {
	/// Creates a request with arbitrary positional arguments.
	pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
		Self {
			method: method.into(),
			args,
		}
	}

	/// `send_data(text)`: the full current buffer, never a diff.
	pub fn send_data(text: impl Into<String>) -> Self {
		Self::new(method::SEND_DATA, vec![Value::String(text.into())])
	}

	/// `open_browser()`.
	pub fn open_browser() -> Self {
		Self::new(method::OPEN_BROWSER, Vec::new())
	}

	/// `chdir(path)`.
	pub fn chdir(path: impl AsRef<Path>) -> Self {
		let path = path.as_ref().to_string_lossy().into_owned();
		Self::new(method::CHDIR, vec![Value::String(path)])
	}

	/// Returns the first argument as a string, if there is one.
	pub fn text_arg(&self) -> Option<&str> {
		self.args.first().and_then(Value::as_str)
	}
}
