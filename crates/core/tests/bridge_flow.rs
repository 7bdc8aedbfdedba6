//! End-to-end bridge behavior against mock renderer scripts.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use composer::{
	Bridge, BridgeState, BufferState, ComposerConfig, Delivery, EditorEvent, EditorHost,
	EventOutcome, Request, StartOutcome, StartTrigger, TransportMode,
};
use composer_protocol::FrameCodec;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingHost {
	messages: Mutex<Vec<String>>,
}

impl EditorHost for RecordingHost {
	fn echo(&self, message: &str) {
		self.messages.lock().push(message.to_string());
	}
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
	let path = dir.join("mock-renderer");
	fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
	let mut perms = fs::metadata(&path).unwrap().permissions();
	perms.set_mode(0o755);
	fs::set_permissions(&path, perms).unwrap();
	path
}

fn config(renderer: PathBuf, transport: TransportMode) -> ComposerConfig {
	ComposerConfig {
		renderer: Some(renderer),
		transport,
		open_browser: false,
		..Default::default()
	}
}

async fn eventually(mut check: impl FnMut() -> bool) {
	tokio::time::timeout(TIMEOUT, async {
		while !check() {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.expect("condition not reached in time");
}

#[tokio::test]
async fn listen_mode_drops_until_connected_then_sends_latest_text() {
	let temp = TempDir::new().unwrap();
	let script = write_script(temp.path(), "exec sleep 30");
	let bridge = Bridge::new(config(script, TransportMode::Listen), Arc::new(RecordingHost::default()));

	let outcome = bridge.start(BufferState::new("v0"), StartTrigger::Manual).unwrap();
	assert_eq!(outcome, StartOutcome::Starting);
	let port = bridge.port().expect("listen-mode port");

	for text in ["v1", "v2"] {
		assert_eq!(bridge.buffer_changed(text), Delivery::Dropped);
	}
	assert_ne!(bridge.state(), BridgeState::Connected);

	let renderer = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
	assert!(bridge.wait_connected(TIMEOUT).await);
	assert_eq!(bridge.state(), BridgeState::Connected);

	assert_eq!(bridge.update("v3").await.unwrap(), Delivery::Sent);

	let mut frames = FramedRead::new(renderer, FrameCodec);
	assert_eq!(frames.next().await.unwrap().unwrap(), Request::send_data("v3"));

	bridge.shutdown().await;
	assert_eq!(bridge.state(), BridgeState::Idle);
	assert_eq!(bridge.port(), None);
}

#[tokio::test]
async fn repeated_start_keeps_port_and_spawns_once() {
	let temp = TempDir::new().unwrap();
	let script = write_script(temp.path(), "exec sleep 30");
	let bridge = Bridge::new(config(script, TransportMode::Listen), Arc::new(RecordingHost::default()));

	assert_eq!(
		bridge.start(BufferState::new("first"), StartTrigger::Manual).unwrap(),
		StartOutcome::Starting
	);
	let port = bridge.port().unwrap();
	eventually(|| bridge.session().launch_count() == 1).await;

	assert_eq!(
		bridge.start(BufferState::new("second"), StartTrigger::Manual).unwrap(),
		StartOutcome::AlreadyStarted
	);

	let _renderer = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
	assert!(bridge.wait_connected(TIMEOUT).await);

	let outcome = bridge.handle_event(EditorEvent::DocumentRecognized {
		filetype: "markdown".into(),
		buffer: BufferState::new("third"),
	});
	assert_eq!(outcome, EventOutcome::Started(StartOutcome::AlreadyStarted));
	assert_eq!(bridge.port(), Some(port));
	assert_eq!(bridge.session().launch_count(), 1);

	bridge.shutdown().await;
}

#[tokio::test]
async fn failed_spawn_is_reported_and_only_manual_start_retries() {
	let temp = TempDir::new().unwrap();
	let host = Arc::new(RecordingHost::default());
	let bridge = Bridge::new(
		config(temp.path().join("no-such-renderer"), TransportMode::Pipe),
		Arc::clone(&host) as Arc<dyn EditorHost>,
	);

	let outcome = bridge.start(BufferState::new("x"), StartTrigger::Manual).unwrap();
	assert_eq!(outcome, StartOutcome::Starting);

	eventually(|| !host.messages.lock().is_empty()).await;
	assert_eq!(bridge.state(), BridgeState::Idle);
	assert!(host.messages.lock()[0].contains("no-such-renderer"));

	let auto = bridge.handle_event(EditorEvent::DocumentRecognized {
		filetype: "markdown".into(),
		buffer: BufferState::new("x"),
	});
	assert_eq!(auto, EventOutcome::Started(StartOutcome::Skipped));

	let manual = bridge.start(BufferState::new("x"), StartTrigger::Manual).unwrap();
	assert_eq!(manual, StartOutcome::Starting);
	eventually(|| host.messages.lock().len() == 2).await;
	assert_eq!(bridge.session().launch_count(), 0);
}

#[tokio::test]
async fn pipe_mode_writes_frames_in_issue_order() {
	let temp = TempDir::new().unwrap();
	let out = temp.path().join("frames.bin");
	let script = write_script(temp.path(), &format!("exec cat > {}", out.display()));
	let bridge = Bridge::new(config(script, TransportMode::Pipe), Arc::new(RecordingHost::default()));

	bridge.start(BufferState::new("# initial"), StartTrigger::Manual).unwrap();
	assert!(bridge.wait_connected(TIMEOUT).await);
	assert_eq!(bridge.port(), None);

	assert_eq!(bridge.update("# one").await.unwrap(), Delivery::Sent);
	assert_eq!(bridge.change_directory(Path::new("/tmp/notes")), Delivery::Queued);
	assert_eq!(bridge.open_browser().unwrap(), Delivery::Queued);
	assert_eq!(bridge.update("# two").await.unwrap(), Delivery::Sent);

	bridge.shutdown().await;

	let file = tokio::fs::File::open(&out).await.unwrap();
	let frames: Vec<Request> = FramedRead::new(file, FrameCodec)
		.map(|frame| frame.unwrap())
		.collect()
		.await;
	assert_eq!(
		frames,
		vec![
			Request::send_data("# one"),
			Request::chdir("/tmp/notes"),
			Request::open_browser(),
			Request::send_data("# two"),
		]
	);
}

#[tokio::test]
async fn renderer_that_never_connects_leaves_sends_inert() {
	let temp = TempDir::new().unwrap();
	let script = write_script(temp.path(), "exec sleep 30");
	let host = Arc::new(RecordingHost::default());
	let bridge = Bridge::new(
		config(script, TransportMode::Listen),
		Arc::clone(&host) as Arc<dyn EditorHost>,
	);

	bridge.start(BufferState::new("x"), StartTrigger::Manual).unwrap();
	eventually(|| bridge.session().renderer_pid().is_some()).await;

	assert!(!bridge.wait_connected(Duration::from_millis(100)).await);
	assert_eq!(bridge.state(), BridgeState::Starting);
	assert_eq!(bridge.buffer_changed("y"), Delivery::Dropped);
	assert_eq!(bridge.update("z").await.unwrap(), Delivery::Dropped);
	assert_eq!(bridge.open_browser().unwrap(), Delivery::Dropped);
	assert!(host.messages.lock().is_empty());

	bridge.shutdown().await;
	assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn start_uses_last_directory_when_buffer_has_none() {
	let temp = TempDir::new().unwrap();
	let out = temp.path().join("argv.txt");
	let script = write_script(
		temp.path(),
		&format!("for arg in \"$@\"; do echo \"$arg\" >> {}; done\nexec cat > /dev/null", out.display()),
	);
	let bridge = Bridge::new(config(script, TransportMode::Pipe), Arc::new(RecordingHost::default()));

	bridge.handle_event(EditorEvent::DirectoryChanged {
		dir: PathBuf::from("/srv/docs"),
	});
	bridge.start(BufferState::new("body"), StartTrigger::Manual).unwrap();
	assert!(bridge.wait_connected(TIMEOUT).await);
	bridge.shutdown().await;

	let recorded = fs::read_to_string(&out).unwrap();
	let args: Vec<&str> = recorded.lines().collect();
	assert_eq!(args, ["--no-browser", "--working-directory=/srv/docs", "body"]);
}

#[tokio::test]
async fn pipe_renderer_that_closes_stdin_can_be_restarted() {
	let temp = TempDir::new().unwrap();
	let script = write_script(temp.path(), "exec 0<&-\nexec sleep 30");
	let bridge = Bridge::new(config(script, TransportMode::Pipe), Arc::new(RecordingHost::default()));

	bridge.start(BufferState::new("x"), StartTrigger::Manual).unwrap();
	assert!(bridge.wait_connected(TIMEOUT).await);
	let first_pid = bridge.session().renderer_pid();
	assert!(first_pid.is_some());

	tokio::time::timeout(TIMEOUT, async {
		while matches!(bridge.update("# lost").await, Ok(Delivery::Sent)) {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.expect("write to closed pipe never failed");

	assert_eq!(bridge.state(), BridgeState::Idle);
	assert_eq!(bridge.session().renderer_pid(), None);

	let again = bridge.start(BufferState::new("x"), StartTrigger::Manual).unwrap();
	assert_eq!(again, StartOutcome::Starting);
	eventually(|| bridge.session().launch_count() == 2).await;
	assert!(bridge.wait_connected(TIMEOUT).await);
	assert_ne!(bridge.session().renderer_pid(), first_pid);

	bridge.shutdown().await;
}

#[tokio::test]
async fn shutdown_during_launch_stops_the_renderer() {
	let temp = TempDir::new().unwrap();
	let script = write_script(temp.path(), "exec sleep 30");
	let bridge = Bridge::new(config(script, TransportMode::Pipe), Arc::new(RecordingHost::default()));

	let outcome = bridge.start(BufferState::new("x"), StartTrigger::Manual).unwrap();
	assert_eq!(outcome, StartOutcome::Starting);
	bridge.shutdown().await;

	assert_eq!(bridge.session().renderer_pid(), None);
	assert_eq!(bridge.state(), BridgeState::Idle);

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(bridge.state(), BridgeState::Idle);
	assert_eq!(bridge.buffer_changed("late"), Delivery::Dropped);
}
