//! Admin-channel codec for unassigned node discovery
//!
//! Unassigned nodes listen on the admin id and answer a query on admin id + 1:
//!
//! ```text
//! query     id 0x3F0  [0x00]
//! response  id 0x3F1  [0x20, uuid0..uuid5, (app_id)]
//! ```

use tracing::trace;

use crate::device::{ApplicationKind, DeviceUuid};
use crate::frame::{Frame, FrameFilter};

/// Administrative broadcast id queries are sent on
pub const ADMIN_ID: u32 = 0x3F0;

/// Id unassigned nodes answer on
pub const ADMIN_RESPONSE_ID: u32 = ADMIN_ID + 1;

/// Command byte: every node without a node id should answer
pub const CMD_QUERY_UNASSIGNED: u8 = 0x00;

/// Response byte: node is waiting for a node id
pub const RESP_NEED_NODEID: u8 = 0x20;

/// Command byte plus six uuid bytes
pub const MIN_RESPONSE_LEN: usize = 7;

/// Decoded answer from an unassigned node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub uuid: DeviceUuid,
    /// Raw application id, absent on older firmware
    pub app_id: Option<u8>,
}

impl Response {
    pub fn application(&self) -> ApplicationKind {
        classify(self.app_id)
    }
}

/// Map a response's optional application id byte to a firmware family
pub fn classify(app_id: Option<u8>) -> ApplicationKind {
    ApplicationKind::from_app_id(app_id)
}

/// Build the broadcast query frame
pub fn encode_query() -> Frame {
    Frame {
        id: ADMIN_ID,
        extended: false,
        len: 1,
        data: [CMD_QUERY_UNASSIGNED, 0, 0, 0, 0, 0, 0, 0],
    }
}

/// Receive filter that only passes admin responses
pub fn response_filter() -> FrameFilter {
    FrameFilter::exact(ADMIN_RESPONSE_ID)
}

/// Decode a node response, returning `None` for anything that is not one
pub fn decode_response(frame: &Frame) -> Option<Response> {
    let data = frame.data();
    if frame.is_extended() || frame.id() != ADMIN_RESPONSE_ID {
        trace!(frame = ?frame, "Ignoring frame on unexpected id");
        return None;
    }
    if data.len() < MIN_RESPONSE_LEN || data[0] != RESP_NEED_NODEID {
        trace!(frame = ?frame, "Ignoring malformed admin response");
        return None;
    }

    let mut uuid = [0u8; 6];
    uuid.copy_from_slice(&data[1..MIN_RESPONSE_LEN]);

    Some(Response {
        uuid: DeviceUuid::from_be_bytes(uuid),
        app_id: data.get(MIN_RESPONSE_LEN).copied(),
    })
}
