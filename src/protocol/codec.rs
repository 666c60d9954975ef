//! Message encoding and decoding.
//!
//! Encoding is deterministic: prost writes fields in tag order and the
//! domain types hold no maps. Decoding never panics on corrupted input; every
//! failure surfaces as a [`DecodeError`].

use crate::error::DecodeError;
use crate::protocol::message::{
    BoundingBox, Message, Payload, RawImage, ReplyPayload, RequestPayload,
};
use crate::protocol::proto::{self, detection_message};
use prost::Message as ProstMessage;

/// Serialize a message to protobuf bytes
pub fn encode(message: &Message) -> Vec<u8> {
    to_proto(message).encode_to_vec()
}

/// Size of `encode(message)` in bytes
pub fn encoded_len(message: &Message) -> usize {
    to_proto(message).encoded_len()
}

/// Parse protobuf bytes into a message
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let raw = proto::DetectionMessage::decode(bytes)?;
    from_proto(raw)
}

fn to_proto(message: &Message) -> proto::DetectionMessage {
    let (command, payload) = match &message.payload {
        Payload::Request(req) => (
            proto::Command::Request,
            detection_message::Payload::Request(proto::Request {
                get_image: req.want_image,
                get_bounding_box_image: req.want_bounding_box_image,
            }),
        ),
        Payload::Reply(rep) => (
            proto::Command::Reply,
            detection_message::Payload::Reply(proto::Reply {
                bounding_boxes: rep.bounding_boxes.iter().map(box_to_proto).collect(),
                image: rep.image.as_ref().map(image_to_proto),
                bounding_box_image: rep.bounding_box_image.as_ref().map(image_to_proto),
            }),
        ),
    };

    proto::DetectionMessage {
        command: command as i32,
        id: message.id,
        time_sent: message.time_sent,
        payload: Some(payload),
    }
}

fn from_proto(raw: proto::DetectionMessage) -> Result<Message, DecodeError> {
    let command = proto::Command::try_from(raw.command)
        .map_err(|_| DecodeError::UnknownCommand(raw.command))?;

    let payload = match (command, raw.payload) {
        (_, None) => return Err(DecodeError::MissingPayload),
        (proto::Command::Request, Some(detection_message::Payload::Request(req))) => {
            Payload::Request(RequestPayload {
                want_image: req.get_image,
                want_bounding_box_image: req.get_bounding_box_image,
            })
        }
        (proto::Command::Reply, Some(detection_message::Payload::Reply(rep))) => {
            Payload::Reply(reply_from_proto(rep)?)
        }
        (proto::Command::Request, Some(detection_message::Payload::Reply(_))) => {
            return Err(DecodeError::CommandMismatch {
                command: "REQUEST",
                payload: "reply",
            });
        }
        (proto::Command::Reply, Some(detection_message::Payload::Request(_))) => {
            return Err(DecodeError::CommandMismatch {
                command: "REPLY",
                payload: "request",
            });
        }
    };

    Ok(Message {
        id: raw.id,
        time_sent: raw.time_sent,
        payload,
    })
}

fn reply_from_proto(rep: proto::Reply) -> Result<ReplyPayload, DecodeError> {
    let bounding_boxes = rep
        .bounding_boxes
        .into_iter()
        .map(box_from_proto)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReplyPayload {
        bounding_boxes,
        image: rep.image.map(image_from_proto).transpose()?,
        bounding_box_image: rep.bounding_box_image.map(image_from_proto).transpose()?,
    })
}

fn box_to_proto(b: &BoundingBox) -> proto::BoundingBox {
    proto::BoundingBox {
        label: b.label.clone(),
        x_min: b.x_min,
        y_min: b.y_min,
        x_max: b.x_max,
        y_max: b.y_max,
        confidence: b.confidence,
    }
}

fn box_from_proto(b: proto::BoundingBox) -> Result<BoundingBox, DecodeError> {
    if !(0.0..=1.0).contains(&b.confidence) {
        return Err(DecodeError::InvalidConfidence(b.confidence));
    }
    Ok(BoundingBox {
        label: b.label,
        x_min: b.x_min,
        y_min: b.y_min,
        x_max: b.x_max,
        y_max: b.y_max,
        confidence: b.confidence,
    })
}

fn image_to_proto(img: &RawImage) -> proto::Image {
    proto::Image {
        width: img.width(),
        height: img.height(),
        channels: img.channels(),
        data: img.data().to_vec(),
    }
}

fn image_from_proto(img: proto::Image) -> Result<RawImage, DecodeError> {
    RawImage::new(img.width, img.height, img.channels, img.data)
}
