//! Board side: answers snapshot requests over one connection.
//!
//! # State Machine
//!
//! ```text
//! Idle ──bind──▶ Listening ──accept──▶ WaitingForPeer ──▶ Connected
//!                                                            │
//!        ┌───────────────────────────────────────────────────┘
//!        ▼
//!   ReceiveRequest ─▶ Acquire+Infer ─▶ PostProcess ─▶ BuildReply ─▶ SendReply
//!        ▲                                                             │
//!        └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport failures end [`BoardSession::serve`]. A REPLY from the host, or
//! a well-formed frame with an unknown command value, is a protocol
//! violation: logged and dropped, the loop continues. Acquisition or detector
//! failures degrade the reply to an empty box list, and images are dropped
//! from replies that would not fit in one frame.

use crate::detection::{
    AnnotationRenderer, BoxPainter, ClassLabels, Detector, ImageSource, Snapshot, build_reply,
    process_detections, results,
};
use crate::error::{DecodeError, Error, ReceiveError, Result};
use crate::protocol::{Message, Payload, RequestPayload, encoded_len};
use crate::transport::{Connection, Listener, MAX_FRAME_LEN};
use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fmt;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Connection lifecycle of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardState {
    Idle,
    Listening,
    WaitingForPeer,
    Connected,
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoardState::Idle => "idle",
            BoardState::Listening => "listening",
            BoardState::WaitingForPeer => "waiting for peer",
            BoardState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Snapshot server
pub struct BoardSession<D, S, R = BoxPainter> {
    detector: D,
    source: S,
    renderer: R,
    labels: ClassLabels,
    /// Owned generator for scene selection, seeded once
    rng: SmallRng,
    save_results: bool,
    state: BoardState,
    /// Replies sent on the current connection
    replies_sent: u64,
}

impl<D: Detector, S: ImageSource, R: AnnotationRenderer> BoardSession<D, S, R> {
    /// Create a session; `seed == 0` seeds from OS entropy
    pub fn new(detector: D, source: S, renderer: R, labels: ClassLabels, seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self {
            detector,
            source,
            renderer,
            labels,
            rng,
            save_results: false,
            state: BoardState::Idle,
            replies_sent: 0,
        }
    }

    /// Also write every annotated image to `results/` beside its source
    pub fn with_save_results(mut self, save_results: bool) -> Self {
        self.save_results = save_results;
        self
    }

    pub fn state(&self) -> BoardState {
        self.state
    }

    pub fn replies_sent(&self) -> u64 {
        self.replies_sent
    }

    fn transition(&mut self, next: BoardState) {
        debug!("Board state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Bind the listening socket (e.g. "0.0.0.0:12345")
    pub fn listen(&mut self, bind_addr: &str) -> Result<Listener> {
        let listener = Listener::bind(bind_addr)?;
        self.transition(BoardState::Listening);
        Ok(listener)
    }

    /// Accept one peer and serve it until the transport fails
    ///
    /// `None` timeouts block indefinitely.
    pub fn run(
        &mut self,
        listener: &Listener,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Result<()> {
        self.transition(BoardState::WaitingForPeer);
        let mut conn = listener.accept()?;
        conn.set_timeouts(read_timeout, write_timeout)?;

        let result = self.serve(&mut conn);
        conn.shutdown();
        result
    }

    /// Answer requests until a transport error occurs
    ///
    /// Never returns `Ok`: the loop ends only when the peer disconnects or
    /// the stream fails, and that error is returned.
    pub fn serve<T: Read + Write>(&mut self, conn: &mut Connection<T>) -> Result<()> {
        self.transition(BoardState::Connected);
        self.replies_sent = 0;
        info!("Serving {} with {} detector", conn.peer(), self.detector.name());

        loop {
            self.serve_one(conn)?;
        }
    }

    /// Receive one message and send its reply, if any
    pub fn serve_one<T: Read + Write>(&mut self, conn: &mut Connection<T>) -> Result<()> {
        let message = match conn.receive() {
            Ok(message) => message,
            // The whole frame was consumed, so the stream is still aligned
            Err(Error::Receive(ReceiveError::Decode(DecodeError::UnknownCommand(command)))) => {
                let violation = Error::ProtocolViolation(format!(
                    "board received unknown command {}, dropping",
                    command
                ));
                error!("{}", violation);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if let Some(mut reply) = self.handle(message) {
            conn.send(&mut reply)?;
            self.replies_sent += 1;
        }
        Ok(())
    }

    /// Compute the reply for one inbound message
    ///
    /// Returns `None` for messages that must not be answered.
    pub fn handle(&mut self, message: Message) -> Option<Message> {
        let id = message.id;
        let request = match message.payload {
            Payload::Request(request) => request,
            Payload::Reply(_) => {
                let violation = Error::ProtocolViolation(format!(
                    "board received REPLY id={}, dropping",
                    id
                ));
                error!("{}", violation);
                return None;
            }
        };

        info!(
            "Request id={} (image: {}, boxed image: {})",
            id, request.want_image, request.want_bounding_box_image
        );

        let snapshot = match self.snapshot(&request) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Request id={}: {}; replying without detections", id, e);
                None
            }
        };
        let mut reply = build_reply(id, &request, snapshot.as_ref());
        fit_in_frame(&mut reply, MAX_FRAME_LEN);
        Some(reply)
    }

    /// Acquire, infer, post-process and annotate one image
    fn snapshot(&mut self, request: &RequestPayload) -> Result<Snapshot> {
        let frame = self.source.acquire(&mut self.rng)?;
        let (width, height) = frame.image.dimensions();

        let start = Instant::now();
        let detections = self.detector.infer(&frame.image)?;
        debug!(
            "Inference on {} ({}x{}) took {:?}",
            frame.path.display(),
            width,
            height,
            start.elapsed()
        );

        let boxes = process_detections(&detections, width, height, &self.labels);
        for b in &boxes {
            info!(
                "RESULT: {}\t{}\t{}\t{}\t{}\t{}",
                b.label, b.x_min, b.y_min, b.x_max, b.y_max, b.confidence
            );
        }

        let annotated = if request.want_bounding_box_image || self.save_results {
            Some(self.renderer.draw_boxes(&frame.image, &boxes))
        } else {
            None
        };

        if self.save_results {
            if let Some(image) = &annotated {
                if let Err(e) = results::save_result(&frame.path, image) {
                    warn!("Failed to save result for {}: {}", frame.path.display(), e);
                }
            }
        }

        Ok(Snapshot {
            image: frame.image,
            annotated: annotated.filter(|_| request.want_bounding_box_image),
            boxes,
        })
    }
}

/// Drop reply images, annotated first, until the encoding fits in `limit`
fn fit_in_frame(reply: &mut Message, limit: u64) {
    while encoded_len(reply) as u64 > limit {
        let Payload::Reply(payload) = &mut reply.payload else {
            return;
        };
        let dropped = if payload.bounding_box_image.take().is_some() {
            "annotated image"
        } else if payload.image.take().is_some() {
            "image"
        } else {
            return;
        };
        warn!(
            "Reply id={} exceeds the {} byte frame limit, omitting the {}",
            reply.id, limit, dropped
        );
    }
}
