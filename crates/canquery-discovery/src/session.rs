//! One query/collect cycle against a single bus interface

use canquery_core::{decode_response, encode_query, response_filter, DiscoveryResult, ResultCollector};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::bus::{BusChannel, BusError, BusTransport};
use crate::clock::Clock;

/// How long to listen for answers after the query is sent
pub const COLLECTION_WINDOW: Duration = Duration::from_secs(2);

/// Discovery session progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opening the bus channel
    Init,
    /// Sending the query
    Broadcasting,
    /// Listening until the window closes
    Collecting,
    /// Channel closed, result produced
    Done,
}

/// Discovery session for one interface.
///
/// The session opens a filtered channel, broadcasts a single query and then
/// listens for the full collection window. Responses are deduplicated by uuid;
/// repeats never extend the window or change a recorded classification.
pub struct DiscoverySession<'a, T, C> {
    transport: &'a T,
    clock: &'a C,
    interface: String,
    state: SessionState,
}

impl<'a, T, C> DiscoverySession<'a, T, C>
where
    T: BusTransport,
    C: Clock,
{
    pub fn new(transport: &'a T, clock: &'a C, interface: impl Into<String>) -> Self {
        Self {
            transport,
            clock,
            interface: interface.into(),
            state: SessionState::Init,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Current state; after a failed run this is the state the failure happened in
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion.
    ///
    /// Open failures and transport errors are returned unchanged. The channel
    /// is closed before this returns on every path.
    pub fn run(&mut self) -> Result<DiscoveryResult, BusError> {
        self.transition(SessionState::Init);
        let mut channel = self.transport.open(&self.interface, response_filter())?;

        self.transition(SessionState::Broadcasting);
        channel.send(&encode_query())?;

        self.transition(SessionState::Collecting);
        let result = self.collect(&mut channel)?;
        drop(channel);

        self.transition(SessionState::Done);
        info!(
            interface = %self.interface,
            found = result.len(),
            "Discovery session complete"
        );
        Ok(result)
    }

    fn collect<Ch: BusChannel>(&self, channel: &mut Ch) -> Result<DiscoveryResult, BusError> {
        let deadline = self.clock.now() + COLLECTION_WINDOW;
        let mut collector = ResultCollector::new(self.interface.as_str(), self.clock.wall_now());

        loop {
            let remaining = deadline.saturating_duration_since(self.clock.now());
            if remaining.is_zero() {
                break;
            }

            let Some(frame) = channel.receive(remaining)? else {
                continue;
            };
            let Some(response) = decode_response(&frame) else {
                continue;
            };

            let application = response.application();
            if collector.record(response.uuid, application) {
                info!(
                    interface = %self.interface,
                    uuid = %response.uuid,
                    application = %application,
                    "Found unassigned node"
                );
            } else {
                trace!(interface = %self.interface, uuid = %response.uuid, "Duplicate response");
            }
        }

        Ok(collector.finish())
    }

    fn transition(&mut self, next: SessionState) {
        debug!(interface = %self.interface, from = ?self.state, to = ?next, "Session state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Scripted, ScriptedTransport, SimClock};
    use canquery_core::codec::{ADMIN_ID, ADMIN_RESPONSE_ID};
    use canquery_core::{ApplicationKind, DeviceUuid, Frame};
    use std::io;

    fn response(uuid: [u8; 6], app_id: Option<u8>) -> Frame {
        let mut payload = vec![0x20];
        payload.extend_from_slice(&uuid);
        payload.extend(app_id);
        Frame::new_standard(ADMIN_RESPONSE_ID, &payload).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_sends_single_query() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock).with_interface("can0", vec![]);

        let mut session = DiscoverySession::new(&transport, &clock, "can0");
        session.run().unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "can0");
        assert_eq!(sent[0].1.id(), ADMIN_ID);
        assert_eq!(sent[0].1.data(), &[0x00]);
        assert_eq!(transport.opened()[0].1, response_filter());
    }

    #[test]
    fn test_runs_full_window_after_devices_found() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock).with_interface(
            "can0",
            vec![Scripted::frame(ms(10), response([1, 2, 3, 4, 5, 6], None))],
        );

        let mut session = DiscoverySession::new(&transport, &clock, "can0");
        let result = session.run().unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(clock.elapsed(), COLLECTION_WINDOW);
        assert_eq!(session.state(), SessionState::Done);
    }

    #[test]
    fn test_duplicates_keep_first_classification() {
        let clock = SimClock::new();
        let uuid = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        let transport = ScriptedTransport::new(&clock).with_interface(
            "can0",
            vec![
                Scripted::frame(ms(5), response(uuid, Some(0x11))),
                Scripted::frame(ms(5), response([1, 1, 1, 1, 1, 1], None)),
                Scripted::frame(ms(1500), response(uuid, Some(0x01))),
                Scripted::frame(ms(5), response(uuid, None)),
            ],
        );

        let result = DiscoverySession::new(&transport, &clock, "can0").run().unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get(DeviceUuid::from_be_bytes(uuid)),
            Some(ApplicationKind::BootloaderFirmware)
        );
        let order: Vec<_> = result.iter().map(|d| d.uuid.to_string()).collect();
        assert_eq!(order, vec!["aabbccddeeff", "010101010101"]);
        // Duplicates late in the window do not extend it
        assert_eq!(clock.elapsed(), COLLECTION_WINDOW);
    }

    #[test]
    fn test_responses_after_window_are_ignored() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock).with_interface(
            "can0",
            vec![
                Scripted::frame(ms(1999), response([0, 0, 0, 0, 0, 1], None)),
                Scripted::frame(ms(2), response([0, 0, 0, 0, 0, 2], None)),
            ],
        );

        let result = DiscoverySession::new(&transport, &clock, "can0").run().unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains(DeviceUuid::try_from(1).unwrap()));
        assert!(!result.contains(DeviceUuid::try_from(2).unwrap()));
        assert_eq!(clock.elapsed(), COLLECTION_WINDOW);
    }

    #[test]
    fn test_malformed_frames_are_skipped() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock)
            .with_interface(
                "can0",
                vec![
                    Scripted::frame(ms(1), Frame::new_standard(ADMIN_RESPONSE_ID, &[0x20, 1, 2]).unwrap()),
                    Scripted::frame(ms(1), Frame::new_standard(ADMIN_RESPONSE_ID, &[0x21, 1, 2, 3, 4, 5, 6]).unwrap()),
                    Scripted::frame(ms(1), Frame::new_standard(0x123, &[0x20, 1, 2, 3, 4, 5, 6]).unwrap()),
                    Scripted::frame(ms(1), response([9, 9, 9, 9, 9, 9], Some(0x42))),
                ],
            )
            .deliver_unfiltered();

        let result = DiscoverySession::new(&transport, &clock, "can0").run().unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(
            result.get(DeviceUuid::from_be_bytes([9; 6])),
            Some(ApplicationKind::Unknown)
        );
    }

    #[test]
    fn test_open_failure_sends_nothing() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock);

        let mut session = DiscoverySession::new(&transport, &clock, "can9");
        let err = session.run().unwrap_err();

        assert!(err.is_device_not_found());
        assert_eq!(session.state(), SessionState::Init);
        assert!(transport.sent().is_empty());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_transport_error_closes_channel() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock).with_interface(
            "can0",
            vec![
                Scripted::frame(ms(10), response([1, 2, 3, 4, 5, 6], None)),
                Scripted::fail(io::ErrorKind::BrokenPipe),
            ],
        );

        let mut session = DiscoverySession::new(&transport, &clock, "can0");
        let err = session.run().unwrap_err();

        assert!(matches!(err, BusError::Transport { .. }));
        assert_eq!(session.state(), SessionState::Collecting);
        assert_eq!(transport.closed(), vec!["can0".to_string()]);
        assert_eq!(transport.open_channels(), 0);
    }

    #[test]
    fn test_channel_closed_after_success() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock).with_interface("can0", vec![]);

        DiscoverySession::new(&transport, &clock, "can0").run().unwrap();

        assert_eq!(transport.closed(), vec!["can0".to_string()]);
        assert_eq!(transport.open_channels(), 0);
    }
}
