//! Host side: periodically asks the board for a snapshot.
//!
//! ```text
//! Connecting ──▶ Ready ──▶ BuildRequest(id=n) ─▶ Send ─▶ Receive ─▶ Correlate
//!                               ▲                                       │
//!                               └──── Sleep(rand) ◀── ConsumeReply ◀────┘
//! ```
//!
//! Correlation is log-only. Transport errors end [`HostSession::run`].

use crate::error::{Error, Result};
use crate::protocol::{BoundingBox, Message, Payload, RawImage, ReplyPayload, RequestPayload};
use crate::transport::Connection;
use image::DynamicImage;
use log::{error, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional reply image the host asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingImage {
    Image,
    BoundingBoxImage,
}

/// Outcome of one request/reply cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplySummary {
    /// Id of the request that was sent
    pub request_id: u32,
    /// Id carried by the answer
    pub reply_id: u32,
    /// False when the answer was not a REPLY
    pub is_reply: bool,
    pub boxes: Vec<BoundingBox>,
    /// Images written to the output directory
    pub saved: Vec<PathBuf>,
    /// Requested images the reply did not carry
    pub missing: Vec<MissingImage>,
}

impl ReplySummary {
    pub fn correlated(&self) -> bool {
        self.request_id == self.reply_id
    }
}

/// Snapshot requester
pub struct HostSession<T = TcpStream> {
    conn: Connection<T>,
    request: RequestPayload,
    output_dir: PathBuf,
    /// Inclusive pause between cycles, in seconds
    sleep_secs: (u64, u64),
    rng: SmallRng,
    next_id: u32,
}

impl<T: Read + Write> HostSession<T> {
    /// Create a session; `seed == 0` seeds from OS entropy
    pub fn new(
        conn: Connection<T>,
        request: RequestPayload,
        output_dir: impl Into<PathBuf>,
        seed: u64,
    ) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self {
            conn,
            request,
            output_dir: output_dir.into(),
            sleep_secs: (5, 20),
            rng,
            next_id: 0,
        }
    }

    /// Pause between cycles, drawn uniformly from `[min, max]` seconds
    pub fn with_sleep_range(mut self, min_secs: u64, max_secs: u64) -> Self {
        self.sleep_secs = (min_secs.min(max_secs), max_secs.max(min_secs));
        self
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    pub fn into_connection(self) -> Connection<T> {
        self.conn
    }

    /// Send request `id`, wait for the answer and consume it
    pub fn exchange(&mut self, id: u32) -> Result<ReplySummary> {
        let mut request = Message::request(id, self.request);
        self.conn.send(&mut request)?;
        let answer = self.conn.receive()?;

        if answer.id != id {
            warn!("Reply id {} does not match request id {}", answer.id, id);
        }
        Ok(self.consume(id, &answer))
    }

    /// Log the boxes and persist the images of one answer
    pub fn consume(&self, request_id: u32, answer: &Message) -> ReplySummary {
        let mut summary = ReplySummary {
            request_id,
            reply_id: answer.id,
            ..Default::default()
        };

        let reply = match &answer.payload {
            Payload::Reply(reply) => reply,
            Payload::Request(_) => {
                error!(
                    "Unsupported command {} from board (id={})",
                    answer.command(),
                    answer.id
                );
                return summary;
            }
        };
        summary.is_reply = true;

        info!(
            "Reply id={} with {} bounding boxes (sent at {:.3})",
            answer.id,
            reply.bounding_boxes.len(),
            answer.time_sent
        );
        for b in &reply.bounding_boxes {
            info!(
                "  {} ({}, {}) - ({}, {}) conf {}",
                b.label, b.x_min, b.y_min, b.x_max, b.y_max, b.confidence
            );
        }
        summary.boxes = reply.bounding_boxes.clone();

        self.persist(answer.id, reply, &mut summary);
        summary
    }

    fn persist(&self, id: u32, reply: &ReplyPayload, summary: &mut ReplySummary) {
        let wanted = [
            (
                self.request.want_image,
                &reply.image,
                format!("{}.jpg", id),
                MissingImage::Image,
            ),
            (
                self.request.want_bounding_box_image,
                &reply.bounding_box_image,
                format!("{}_bbox.jpg", id),
                MissingImage::BoundingBoxImage,
            ),
        ];

        for (want, image, name, kind) in wanted {
            if !want {
                continue;
            }
            let Some(image) = image else {
                error!("Reply id={} is missing the requested {:?}", id, kind);
                summary.missing.push(kind);
                continue;
            };
            let path = self.output_dir.join(name);
            match save_jpeg(image, &path) {
                Ok(()) => {
                    info!("Saved {}", path.display());
                    summary.saved.push(path);
                }
                Err(e) => error!("Failed to save {}: {}", path.display(), e),
            }
        }
    }

    /// Run one cycle with the next id
    pub fn cycle(&mut self) -> Result<ReplySummary> {
        let id = self.next_id;
        let summary = self.exchange(id)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(summary)
    }

    /// Draw the pause before the next cycle
    pub fn next_sleep(&mut self) -> Duration {
        let (min, max) = self.sleep_secs;
        Duration::from_secs(self.rng.gen_range(min..=max))
    }

    /// Request snapshots until `max_requests` cycles ran (forever if `None`)
    ///
    /// Returns the number of completed cycles. Transport errors end the loop.
    pub fn run(&mut self, max_requests: Option<u64>) -> Result<u64> {
        let mut completed = 0u64;
        loop {
            self.cycle()?;
            completed += 1;
            if max_requests.is_some_and(|max| completed >= max) {
                info!("Completed {} requests", completed);
                return Ok(completed);
            }

            let pause = self.next_sleep();
            info!("Sleeping {}s before next request", pause.as_secs());
            std::thread::sleep(pause);
        }
    }
}

/// Encode a raw reply image as JPEG
fn save_jpeg(image: &RawImage, path: &Path) -> Result<()> {
    let decoded = image.to_dynamic_image().ok_or(Error::UnsupportedImage {
        channels: image.channels(),
    })?;
    // JPEG has no alpha channel
    let encodable = match decoded {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => decoded,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };
    encodable.save(path)?;
    Ok(())
}
