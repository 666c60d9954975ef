//! End-to-end board/host exchanges over loopback TCP.
//!
//! Each test binds the board on an ephemeral port, serves it from a thread,
//! and drives it with a real host connection.

use drishti::detection::{BoxPainter, ClassLabels, Detection, DirectorySource, StaticDetector};
use drishti::error::{DecodeError, Error, ReceiveError};
use drishti::protocol::{Message, ReplyPayload, RequestPayload};
use drishti::session::{BoardSession, HostSession};
use drishti::transport::{Connection, Listener, write_frame};
use image::{Rgb, RgbImage};
use std::io::Write;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;

const IO_TIMEOUT: Option<Duration> = Some(Duration::from_secs(10));

fn write_scene(dir: &Path, name: &str, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([40, 80, 120]))
        .save(dir.join(name))
        .unwrap();
}

/// Start a board serving `scenes`; returns its address and the serve thread
fn spawn_board(
    scenes: &Path,
    detections: Vec<Detection>,
) -> (String, JoinHandle<drishti::Result<()>>) {
    let listener = Listener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().to_string();

    let mut session = BoardSession::new(
        StaticDetector::new(detections),
        DirectorySource::new(scenes),
        BoxPainter::default(),
        ClassLabels::default(),
        42,
    );
    let handle = thread::spawn(move || session.run(&listener, IO_TIMEOUT, IO_TIMEOUT));
    (addr, handle)
}

fn connect(addr: &str) -> Connection {
    let conn = Connection::connect(addr).unwrap();
    conn.set_timeouts(IO_TIMEOUT, IO_TIMEOUT).unwrap();
    conn
}

fn finish(conn: Connection, board: JoinHandle<drishti::Result<()>>) -> Error {
    conn.shutdown();
    drop(conn);
    board.join().unwrap().unwrap_err()
}

#[test]
fn test_snapshot_with_raw_image_only() {
    let scenes = TempDir::new().unwrap();
    write_scene(scenes.path(), "harbor.png", 640, 480);
    let (addr, board) = spawn_board(
        scenes.path(),
        vec![Detection::new(3, 0.1, 0.1, 0.2, 0.2, 0.9)],
    );

    let mut conn = connect(&addr);
    let mut request = Message::request(7, RequestPayload::new(true, false));
    conn.send(&mut request).unwrap();
    let reply = conn.receive().unwrap();

    assert_eq!(reply.id, 7);
    let payload = reply.as_reply().unwrap();
    assert_eq!(payload.bounding_boxes.len(), 1);
    let b = &payload.bounding_boxes[0];
    assert_eq!(b.label, "3");
    assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (65.0, 49.0, 193.0, 145.0));
    assert_eq!(b.confidence, 0.9);

    let image = payload.image.as_ref().unwrap();
    assert_eq!((image.width(), image.height(), image.channels()), (640, 480, 3));
    assert_eq!(&image.data()[..3], &[40, 80, 120]);
    assert!(payload.bounding_box_image.is_none());

    let err = finish(conn, board);
    assert!(matches!(err, Error::Receive(ReceiveError::PeerClosed)));
}

#[test]
fn test_zero_detections_reply_is_not_an_error() {
    let scenes = TempDir::new().unwrap();
    write_scene(scenes.path(), "empty_sea.png", 32, 24);
    let (addr, board) = spawn_board(scenes.path(), Vec::new());

    let mut conn = connect(&addr);
    conn.send(&mut Message::request(1, RequestPayload::new(false, true)))
        .unwrap();
    let reply = conn.receive().unwrap();

    let payload = reply.as_reply().unwrap();
    assert!(payload.bounding_boxes.is_empty());
    assert!(payload.image.is_none());
    let boxed = payload.bounding_box_image.as_ref().unwrap();
    assert_eq!((boxed.width(), boxed.height()), (32, 24));

    finish(conn, board);
}

#[test]
fn test_reply_ids_track_request_ids() {
    let scenes = TempDir::new().unwrap();
    write_scene(scenes.path(), "a.png", 16, 16);
    write_scene(scenes.path(), "b.png", 20, 10);
    let (addr, board) = spawn_board(
        scenes.path(),
        vec![Detection::new(0, 0.25, 0.25, 0.5, 0.5, 0.6)],
    );

    let mut conn = connect(&addr);
    for id in [0, 1, 2, 1000, u32::MAX] {
        conn.send(&mut Message::request(id, RequestPayload::default()))
            .unwrap();
        let reply = conn.receive().unwrap();
        assert_eq!(reply.id, id);
        assert_eq!(reply.as_reply().unwrap().bounding_boxes.len(), 1);
    }

    finish(conn, board);
}

#[test]
fn test_unexpected_reply_is_dropped_and_loop_continues() {
    let scenes = TempDir::new().unwrap();
    write_scene(scenes.path(), "a.png", 8, 8);
    let (addr, board) = spawn_board(scenes.path(), Vec::new());

    let mut conn = connect(&addr);
    conn.send(&mut Message::reply(50, ReplyPayload::default()))
        .unwrap();
    conn.send(&mut Message::request(51, RequestPayload::default()))
        .unwrap();

    // Only the request is answered
    let reply = conn.receive().unwrap();
    assert_eq!(reply.id, 51);

    finish(conn, board);
}

#[test]
fn test_empty_scene_directory_degrades_reply() {
    let scenes = TempDir::new().unwrap();
    let (addr, board) = spawn_board(
        scenes.path(),
        vec![Detection::new(3, 0.1, 0.1, 0.2, 0.2, 0.9)],
    );

    let mut conn = connect(&addr);
    conn.send(&mut Message::request(3, RequestPayload::new(true, true)))
        .unwrap();
    let reply = conn.receive().unwrap();

    assert_eq!(reply.id, 3);
    assert_eq!(reply.as_reply(), Some(&ReplyPayload::default()));

    finish(conn, board);
}

#[test]
fn test_truncated_frame_ends_board_session() {
    let scenes = TempDir::new().unwrap();
    write_scene(scenes.path(), "a.png", 8, 8);
    let (addr, board) = spawn_board(scenes.path(), Vec::new());

    let conn = connect(&addr);
    let mut stream = conn.into_inner();
    let mut scratch = Vec::new();
    write_frame(&mut stream, &[], &mut scratch).unwrap();
    stream.flush().unwrap();

    let err = board.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        Error::Receive(ReceiveError::Decode(DecodeError::MissingPayload))
    ));
}

#[test]
fn test_host_session_persists_images() {
    let scenes = TempDir::new().unwrap();
    write_scene(scenes.path(), "dock.png", 64, 48);
    let (addr, board) = spawn_board(
        scenes.path(),
        vec![Detection::new(1, 0.1, 0.2, 0.3, 0.4, 0.75)],
    );
    let output = TempDir::new().unwrap();

    let conn = connect(&addr);
    let mut host = HostSession::new(conn, RequestPayload::new(true, true), output.path(), 3)
        .with_sleep_range(0, 0);
    assert_eq!(host.run(Some(2)).unwrap(), 2);

    for name in ["0.jpg", "0_bbox.jpg", "1.jpg", "1_bbox.jpg"] {
        let saved = image::open(output.path().join(name)).unwrap();
        assert_eq!((saved.width(), saved.height()), (64, 48));
    }

    let summary = host.exchange(9).unwrap();
    assert!(summary.correlated());
    assert_eq!(summary.boxes.len(), 1);
    assert!(summary.missing.is_empty());

    finish(host.into_connection(), board);
}
