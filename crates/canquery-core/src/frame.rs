//! CAN frame types exchanged over the bus

use std::fmt;
use thiserror::Error;

/// Maximum payload length of a classic CAN frame
pub const MAX_PAYLOAD: usize = 8;

/// Mask covering the full 11-bit standard identifier space
pub const STANDARD_ID_MASK: u32 = 0x7FF;

/// Mask covering the full 29-bit extended identifier space
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD} byte CAN limit")]
    PayloadTooLong(usize),
    #[error("standard identifier {0:#x} does not fit in 11 bits")]
    StandardIdOutOfRange(u32),
    #[error("extended identifier {0:#x} does not fit in 29 bits")]
    ExtendedIdOutOfRange(u32),
}

/// A classic CAN data frame
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub(crate) id: u32,
    pub(crate) extended: bool,
    pub(crate) len: u8,
    pub(crate) data: [u8; MAX_PAYLOAD],
}

impl Frame {
    /// Create a frame with an 11-bit identifier
    pub fn new_standard(id: u32, payload: &[u8]) -> Result<Self, FrameError> {
        if id > STANDARD_ID_MASK {
            return Err(FrameError::StandardIdOutOfRange(id));
        }
        Self::build(id, false, payload)
    }

    /// Create a frame with a 29-bit identifier
    pub fn new_extended(id: u32, payload: &[u8]) -> Result<Self, FrameError> {
        if id > EXTENDED_ID_MASK {
            return Err(FrameError::ExtendedIdOutOfRange(id));
        }
        Self::build(id, true, payload)
    }

    fn build(id: u32, extended: bool, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLong(payload.len()));
        }
        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            extended,
            len: payload.len() as u8,
            data,
        })
    }

    /// Arbitration identifier
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Payload bytes (0 to 8)
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Data length code
    pub fn dlc(&self) -> usize {
        self.len as usize
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &format_args!("{:#05x}", self.id))
            .field("extended", &self.extended)
            .field("data", &format_args!("{:02x?}", self.data()))
            .finish()
    }
}

/// Kernel-style receive filter: a frame passes when `frame.id & mask == id & mask`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFilter {
    pub id: u32,
    pub mask: u32,
}

impl FrameFilter {
    /// Filter accepting exactly one standard identifier
    pub fn exact(id: u32) -> Self {
        Self {
            id,
            mask: STANDARD_ID_MASK,
        }
    }

    /// Check whether a frame would be delivered through this filter.
    /// Only standard frames pass.
    pub fn matches(&self, frame: &Frame) -> bool {
        !frame.is_extended() && (frame.id() & self.mask) == (self.id & self.mask)
    }
}
