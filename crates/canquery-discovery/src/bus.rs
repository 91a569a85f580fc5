//! Bus channel capability traits
//!
//! The discovery session only needs four things from a bus: open with a
//! receive filter, send a frame, receive with a bounded wait, and close.
//! Closing is tied to `Drop` so a channel is released on every exit path.

use canquery_core::{Frame, FrameFilter};
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Interface {interface} not found")]
    DeviceNotFound { interface: String },
    #[error("Transport error on {interface}: {source}")]
    Transport {
        interface: String,
        #[source]
        source: io::Error,
    },
}

impl BusError {
    pub fn not_found(interface: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            interface: interface.into(),
        }
    }

    pub fn transport(interface: impl Into<String>, source: io::Error) -> Self {
        Self::Transport {
            interface: interface.into(),
            source,
        }
    }

    /// Interface the error occurred on
    pub fn interface(&self) -> &str {
        match self {
            Self::DeviceNotFound { interface } | Self::Transport { interface, .. } => interface,
        }
    }

    pub fn is_device_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. })
    }
}

/// An open, filtered bus channel. Dropping the channel closes it.
pub trait BusChannel {
    /// Transmit one frame. No acknowledgment is awaited.
    fn send(&mut self, frame: &Frame) -> Result<(), BusError>;

    /// Wait up to `max_wait` for a frame. `Ok(None)` means nothing arrived in time.
    fn receive(&mut self, max_wait: Duration) -> Result<Option<Frame>, BusError>;
}

/// Opens channels on named bus interfaces
pub trait BusTransport {
    type Channel: BusChannel;

    /// Open `interface`, delivering only frames that pass `filter`.
    /// A missing interface is reported as [`BusError::DeviceNotFound`].
    fn open(&self, interface: &str, filter: FrameFilter) -> Result<Self::Channel, BusError>;
}
