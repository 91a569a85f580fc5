//! canquery core - Frame types, wire codec, and discovery results
//!
//! This crate provides the I/O-free building blocks of CAN bus node discovery:
//! - CAN frame and receive filter types
//! - The admin-channel codec (query encoding, response decoding, classification)
//! - Device identifiers and firmware classification
//! - Per-interface discovery results with first-seen ordering

pub mod codec;
pub mod device;
pub mod frame;
pub mod result;

pub use codec::{classify, decode_response, encode_query, response_filter, Response};
pub use device::{ApplicationKind, DeviceUuid, DeviceUuidError, DiscoveredDevice};
pub use frame::{Frame, FrameError, FrameFilter};
pub use result::{DiscoveryResult, ResultCollector};
