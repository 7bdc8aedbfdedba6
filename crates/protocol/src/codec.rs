//! MessagePack framing.
//!
//! A frame is a MessagePack array whose first element is the method name and
//! whose remaining elements are the positional arguments. MessagePack is
//! self-delimiting, so frames are written back to back without a length
//! prefix and the decoder finds boundaries by parsing.

use std::io::{Cursor, ErrorKind};

use bytes::{Buf, BytesMut};
use serde::Serialize;
use serde::ser::{SerializeSeq, Serializer};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Error, Result};
use crate::request::Request;

/// Borrowed view of a frame, serialized as `[method, args...]`.
struct FrameRef<'a> {
	method: &'a str,
	args: &'a [Value],
}

impl Serialize for FrameRef<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let mut seq = serializer.serialize_seq(Some(1 + self.args.len()))?;
		seq.serialize_element(self.method)?;
		for arg in self.args {
			seq.serialize_element(arg)?;
		}
		seq.end()
	}
}

/// Encodes one frame.
///
/// # Errors
///
/// Returns [`Error::UnsupportedArgument`] if an argument is an array or an
/// object. Nothing is encoded in that case.
pub fn encode(method: &str, args: &[Value]) -> Result<Vec<u8>> {
	for (index, arg) in args.iter().enumerate() {
		let kind = match arg {
			Value::Array(_) => "array",
			Value::Object(_) => "object",
			_ => continue,
		};
		return Err(Error::UnsupportedArgument {
			method: method.to_string(),
			index,
			kind,
		});
	}

	Ok(rmp_serde::to_vec(&FrameRef { method, args })?)
}

/// Decodes exactly one frame from `bytes`.
///
/// Trailing bytes after the first frame are an error.
pub fn decode(bytes: &[u8]) -> Result<Request> {
	let mut cursor = Cursor::new(bytes);
	let values: Vec<Value> = rmp_serde::from_read(&mut cursor)?;
	let consumed = cursor.position() as usize;
	if consumed != bytes.len() {
		return Err(Error::MalformedFrame(format!(
			"{} trailing bytes after frame",
			bytes.len() - consumed
		)));
	}
	into_request(values)
}

fn into_request(values: Vec<Value>) -> Result<Request> {
	let mut values = values.into_iter();
	match values.next() {
		Some(Value::String(method)) => Ok(Request::new(method, values.collect())),
		Some(other) => Err(Error::MalformedFrame(format!(
			"expected method name, found {other}"
		))),
		None => Err(Error::MalformedFrame("empty frame".to_string())),
	}
}

/// A partial frame surfaces as an unexpected EOF while reading a marker or
/// its payload.
fn is_incomplete(err: &rmp_serde::decode::Error) -> bool {
	use rmp_serde::decode::Error as DecodeError;

	match err {
		DecodeError::InvalidMarkerRead(io) | DecodeError::InvalidDataRead(io) => {
			io.kind() == ErrorKind::UnexpectedEof
		}
		_ => false,
	}
}

/// Streaming codec for [`Request`] frames.
///
/// Use with `FramedWrite` on the editor side and `FramedRead` on the
/// receiving side.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Encoder<Request> for FrameCodec {
	type Error = Error;

	fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<()> {
		let frame = encode(&item.method, &item.args)?;
		dst.extend_from_slice(&frame);
		Ok(())
	}
}

impl Decoder for FrameCodec {
	type Item = Request;
	type Error = Error;

	fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>> {
		if src.is_empty() {
			return Ok(None);
		}

		let mut cursor = Cursor::new(&src[..]);
		let values: Vec<Value> = match rmp_serde::from_read(&mut cursor) {
			Ok(values) => values,
			Err(err) if is_incomplete(&err) => return Ok(None),
			Err(err) => return Err(err.into()),
		};
		let consumed = cursor.position() as usize;

		src.advance(consumed);
		into_request(values).map(Some)
	}
}

#[cfg(test)]
mod tests {
	use futures_util::{SinkExt, StreamExt};
	use serde_json::json;
	use tokio_util::codec::{FramedRead, FramedWrite};

	use super::*;

	#[test]
	fn frame_is_an_array_led_by_the_method() {
		let bytes = encode("open_browser", &[]).unwrap();

		// fixarray(1), fixstr(12), "open_browser"
		assert_eq!(bytes[0], 0x91);
		assert_eq!(bytes[1], 0xac);
		assert_eq!(&bytes[2..], b"open_browser");
	}

	#[test]
	fn round_trip_preserves_embedded_newlines() {
		let bytes = encode("send_data", &[json!("hello\nworld")]).unwrap();
		let request = decode(&bytes).unwrap();

		assert_eq!(request.method, "send_data");
		assert_eq!(request.args, vec![json!("hello\nworld")]);
	}

	#[test]
	fn mixed_scalar_arguments_keep_their_order() {
		let args = vec![json!("a"), json!(42), json!(-7), json!(true), json!(null)];
		let request = decode(&encode("custom", &args).unwrap()).unwrap();

		assert_eq!(request, Request::new("custom", args));
	}

	#[test]
	fn non_ascii_text_survives() {
		let text = "# Überschrift\n\n日本語 ✓";
		let request = decode(&encode("send_data", &[json!(text)]).unwrap()).unwrap();
		assert_eq!(request.text_arg(), Some(text));
	}

	#[test]
	fn object_argument_is_rejected() {
		let err = encode("send_data", &[json!("ok"), json!({"nested": true})]).unwrap_err();

		match err {
			Error::UnsupportedArgument {
				method,
				index,
				kind,
			} => {
				assert_eq!(method, "send_data");
				assert_eq!(index, 1);
				assert_eq!(kind, "object");
			}
			other => panic!("expected UnsupportedArgument, got {other:?}"),
		}
	}

	#[test]
	fn array_argument_is_rejected() {
		let err = encode("chdir", &[json!(["a", "b"])]).unwrap_err();
		assert!(matches!(err, Error::UnsupportedArgument { kind: "array", .. }));
	}

	#[test]
	fn frame_without_method_is_malformed() {
		let bytes = rmp_serde::to_vec(&(1u8, "x")).unwrap();
		assert!(matches!(decode(&bytes), Err(Error::MalformedFrame(_))));

		let empty = rmp_serde::to_vec(&Vec::<String>::new()).unwrap();
		assert!(matches!(decode(&empty), Err(Error::MalformedFrame(_))));
	}

	#[test]
	fn decoder_waits_for_a_complete_frame() {
		let bytes = encode("send_data", &[json!("x".repeat(300))]).unwrap();
		let mut codec = FrameCodec;
		let mut buf = BytesMut::new();

		buf.extend_from_slice(&bytes[..bytes.len() / 2]);
		assert!(codec.decode(&mut buf).unwrap().is_none());
		assert_eq!(buf.len(), bytes.len() / 2);

		buf.extend_from_slice(&bytes[bytes.len() / 2..]);
		let request = codec.decode(&mut buf).unwrap().unwrap();
		assert_eq!(request.text_arg().map(str::len), Some(300));
		assert!(buf.is_empty());
	}

	#[test]
	fn decoder_splits_back_to_back_frames() {
		let mut buf = BytesMut::new();
		buf.extend_from_slice(&encode("send_data", &[json!("one")]).unwrap());
		buf.extend_from_slice(&encode("chdir", &[json!("/tmp")]).unwrap());
		buf.extend_from_slice(&encode("open_browser", &[]).unwrap());

		let mut codec = FrameCodec;
		let methods: Vec<String> = std::iter::from_fn(|| codec.decode(&mut buf).unwrap())
			.map(|request| request.method)
			.collect();

		assert_eq!(methods, ["send_data", "chdir", "open_browser"]);
	}

	#[tokio::test]
	async fn framed_stream_carries_requests_in_order() {
		let (reader, writer) = tokio::io::duplex(64);
		let mut sink = FramedWrite::new(writer, FrameCodec);
		let mut stream = FramedRead::new(reader, FrameCodec);

		let large = "line\n".repeat(10_000);
		let sent = vec![
			Request::chdir("/tmp/notes"),
			Request::send_data(large),
			Request::open_browser(),
		];

		let to_send = sent.clone();
		let writer_task = tokio::spawn(async move {
			for request in to_send {
				sink.send(request).await.unwrap();
			}
		});

		for expected in &sent {
			let received = stream.next().await.unwrap().unwrap();
			assert_eq!(&received, expected);
		}
		writer_task.await.unwrap();
	}
}
