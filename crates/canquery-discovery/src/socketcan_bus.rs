//! SocketCAN bus transport (Linux)

use canquery_core::{Frame, FrameFilter};
use socketcan::{
    CanDataFrame, CanFilter, CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket,
    SocketOptions, StandardId,
};
use std::io;
use std::time::Duration;
use tracing::{debug, trace};

use crate::bus::{BusChannel, BusError, BusTransport};

/// Opens raw CAN sockets on kernel interfaces
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketCanTransport;

impl BusTransport for SocketCanTransport {
    type Channel = SocketCanChannel;

    fn open(&self, interface: &str, filter: FrameFilter) -> Result<SocketCanChannel, BusError> {
        let socket = CanSocket::open(interface).map_err(|e| {
            if e.raw_os_error() == Some(libc::ENODEV) {
                BusError::not_found(interface)
            } else {
                BusError::transport(interface, e)
            }
        })?;

        // Match standard frames only, the same as the kernel filter for an
        // 11-bit id with the EFF bit in the mask
        let kernel_filter = CanFilter::new(filter.id, filter.mask | libc::CAN_EFF_FLAG);
        socket
            .set_filters(&[kernel_filter])
            .map_err(|e| BusError::transport(interface, e))?;

        debug!(interface = %interface, id = filter.id, mask = filter.mask, "Opened CAN socket");
        Ok(SocketCanChannel {
            interface: interface.to_string(),
            socket,
        })
    }
}

/// Read errors that mean "nothing arrived" rather than a broken socket.
/// A signal interrupting the wait is retried by the caller's deadline loop.
fn is_no_frame(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Raw CAN socket bound to one interface; closed on drop
pub struct SocketCanChannel {
    interface: String,
    socket: CanSocket,
}

impl SocketCanChannel {
    fn to_socketcan(&self, frame: &Frame) -> Result<CanDataFrame, BusError> {
        let id: Id = if frame.is_extended() {
            ExtendedId::new(frame.id()).map(Id::Extended)
        } else {
            u16::try_from(frame.id())
                .ok()
                .and_then(StandardId::new)
                .map(Id::Standard)
        }
        .ok_or_else(|| self.invalid_frame(frame))?;

        CanDataFrame::new(id, frame.data()).ok_or_else(|| self.invalid_frame(frame))
    }

    fn invalid_frame(&self, frame: &Frame) -> BusError {
        BusError::transport(
            &self.interface,
            io::Error::new(io::ErrorKind::InvalidInput, format!("unencodable frame {:?}", frame)),
        )
    }
}

impl BusChannel for SocketCanChannel {
    fn send(&mut self, frame: &Frame) -> Result<(), BusError> {
        let data_frame = self.to_socketcan(frame)?;
        trace!(interface = %self.interface, frame = ?frame, "Sending frame");
        self.socket
            .write_frame(&data_frame)
            .map_err(|e| BusError::transport(&self.interface, e))
    }

    fn receive(&mut self, max_wait: Duration) -> Result<Option<Frame>, BusError> {
        let received = match self.socket.read_frame_timeout(max_wait) {
            Ok(frame) => frame,
            Err(e) if is_no_frame(e.kind()) => {
                trace!(interface = %self.interface, kind = ?e.kind(), "No frame received");
                return Ok(None);
            }
            Err(e) => return Err(BusError::transport(&self.interface, e)),
        };

        let data_frame = match received {
            CanFrame::Data(f) => f,
            CanFrame::Remote(_) | CanFrame::Error(_) => {
                trace!(interface = %self.interface, "Ignoring non-data frame");
                return Ok(None);
            }
        };

        let frame = match data_frame.id() {
            Id::Standard(id) => Frame::new_standard(u32::from(id.as_raw()), data_frame.data()),
            Id::Extended(id) => Frame::new_extended(id.as_raw(), data_frame.data()),
        }
        .map_err(|e| {
            BusError::transport(&self.interface, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;

        trace!(interface = %self.interface, frame = ?frame, "Received frame");
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canquery_core::response_filter;

    #[test]
    fn test_wait_outcomes_are_not_failures() {
        assert!(is_no_frame(io::ErrorKind::TimedOut));
        assert!(is_no_frame(io::ErrorKind::WouldBlock));
        assert!(is_no_frame(io::ErrorKind::Interrupted));
        assert!(!is_no_frame(io::ErrorKind::PermissionDenied));
        assert!(!is_no_frame(io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_missing_interface_is_device_not_found() {
        let err = SocketCanTransport
            .open("nonexistent0", response_filter())
            .err()
            .unwrap();
        assert!(err.is_device_not_found());
        assert_eq!(err.interface(), "nonexistent0");
    }
}
