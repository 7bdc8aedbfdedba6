//! Frame dump.
//!
//! Decodes renderer frames and prints each as a JSON line. It accepts the
//! same trailing arguments the bridge passes to a renderer, so it can stand
//! in for one:
//!
//! ```text
//! composer dump --output frames.jsonl -- --no-browser "# text"          # pipe-mode
//! composer dump --connect -- --no-browser 40123 "# text"               # listen-mode
//! ```

use std::fs::File;
use std::io::{self, Write};

use anyhow::Context;
use composer_protocol::FrameCodec;
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

use crate::cli::DumpArgs;

pub async fn execute(args: DumpArgs) -> anyhow::Result<()> {
	let mut sink: Box<dyn Write + Send> = match &args.output {
		Some(path) => Box::new(
			File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
		),
		None => Box::new(io::stdout()),
	};

	let count = if args.connect {
		let port = renderer_port(&args.args).context("no port in renderer arguments")?;
		let stream = TcpStream::connect(("127.0.0.1", port))
			.await
			.with_context(|| format!("cannot connect to 127.0.0.1:{port}"))?;
		info!(target = "composer.dump", port, "connected to bridge");
		pump(stream, &mut sink).await?
	} else {
		pump(tokio::io::stdin(), &mut sink).await?
	};

	debug!(target = "composer.dump", frames = count, "input closed");
	Ok(())
}

/// Copies decoded frames to `sink` until the input closes.
pub async fn pump<R, W>(input: R, sink: &mut W) -> anyhow::Result<usize>
where
	R: AsyncRead + Unpin,
	W: Write + ?Sized,
{
	let mut frames = FramedRead::new(input, FrameCodec);
	let mut count = 0;

	while let Some(frame) = frames.next().await {
		let request = frame.context("malformed frame")?;
		serde_json::to_writer(&mut *sink, &request)?;
		writeln!(sink)?;
		sink.flush()?;
		count += 1;
	}

	Ok(count)
}

/// The port in a renderer invocation: the first argument that parses as one.
pub fn renderer_port(args: &[String]) -> Option<u16> {
	args.iter()
		.filter(|arg| !arg.starts_with('-'))
		.find_map(|arg| arg.parse().ok())
}

#[cfg(test)]
mod tests {
	use composer_protocol::{Request, encode};
	use serde_json::json;

	use super::*;

	#[test]
	fn port_is_first_numeric_positional() {
		let args: Vec<String> = ["--browser=firefox", "--no-browser", "40123", "42", "/tmp/a.md"]
			.map(String::from)
			.to_vec();
		assert_eq!(renderer_port(&args), Some(40123));

		let pipe: Vec<String> = ["--no-browser", "# text"].map(String::from).to_vec();
		assert_eq!(renderer_port(&pipe), None);
	}

	#[tokio::test]
	async fn frames_become_json_lines() {
		let mut input = encode("send_data", &[json!("# one\ntwo")]).unwrap();
		input.extend(encode("open_browser", &[]).unwrap());
		input.extend(encode("chdir", &[json!("/tmp")]).unwrap());

		let mut out = Vec::new();
		let count = pump(input.as_slice(), &mut out).await.unwrap();

		assert_eq!(count, 3);
		let lines: Vec<Request> = String::from_utf8(out)
			.unwrap()
			.lines()
			.map(|line| serde_json::from_str(line).unwrap())
			.collect();
		assert_eq!(
			lines,
			vec![
				Request::send_data("# one\ntwo"),
				Request::open_browser(),
				Request::chdir("/tmp"),
			]
		);
	}

	#[tokio::test]
	async fn garbage_input_is_an_error() {
		let mut out = Vec::new();
		let err = pump(&[0x92, 0x01, 0x02][..], &mut out).await.unwrap_err();
		assert!(err.to_string().contains("malformed frame"));
	}
}
