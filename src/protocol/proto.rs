//! Protobuf types generated from `proto/drishti.proto`.

#![allow(clippy::enum_variant_names)]

include!(concat!(env!("OUT_DIR"), "/drishti.rs"));

pub use self::detection_message::Command;
