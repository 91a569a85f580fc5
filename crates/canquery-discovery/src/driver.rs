//! Runs discovery sessions over a list of interfaces, one at a time

use canquery_core::DiscoveryResult;
use thiserror::Error;
use tracing::{info, warn};

use crate::bus::{BusError, BusTransport};
use crate::clock::Clock;
use crate::session::DiscoverySession;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("No CAN interfaces found")]
    NoInterfaces,
}

/// Receives the outcome of each interface's session as it completes
pub trait Reporter {
    fn report(&mut self, interface: &str, outcome: Result<&DiscoveryResult, &BusError>);
}

/// Totals across a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Interfaces a session was started on
    pub attempted: usize,
    /// Interfaces whose session failed
    pub failed: usize,
    /// Devices found across all interfaces
    pub devices: usize,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Run one session per interface in order, forwarding each outcome to `reporter`.
///
/// A failing interface is reported and skipped; the remaining interfaces still
/// run. An empty interface list is an error for the whole run.
pub fn run_interfaces<T, C, R, I, S>(
    transport: &T,
    clock: &C,
    interfaces: I,
    reporter: &mut R,
) -> Result<RunSummary, DriverError>
where
    T: BusTransport,
    C: Clock,
    R: Reporter + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut summary = RunSummary::default();

    for interface in interfaces {
        let interface = interface.as_ref();
        summary.attempted += 1;

        info!(interface = %interface, "Querying for unassigned nodes");
        match DiscoverySession::new(transport, clock, interface).run() {
            Ok(result) => {
                summary.devices += result.len();
                reporter.report(interface, Ok(&result));
            }
            Err(e) => {
                warn!(interface = %interface, error = %e, "Discovery failed");
                summary.failed += 1;
                reporter.report(interface, Err(&e));
            }
        }
    }

    if summary.attempted == 0 {
        return Err(DriverError::NoInterfaces);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Scripted, ScriptedTransport, SimClock};
    use canquery_core::codec::ADMIN_RESPONSE_ID;
    use canquery_core::Frame;
    use std::io;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        outcomes: Vec<(String, Result<usize, String>)>,
    }

    impl Reporter for Recorder {
        fn report(&mut self, interface: &str, outcome: Result<&DiscoveryResult, &BusError>) {
            self.outcomes.push((
                interface.to_string(),
                outcome.map(|r| r.len()).map_err(|e| e.to_string()),
            ));
        }
    }

    fn response(last: u8) -> Scripted {
        Scripted::frame(
            Duration::from_millis(50),
            Frame::new_standard(ADMIN_RESPONSE_ID, &[0x20, 0, 0, 0, 0, 0, last]).unwrap(),
        )
    }

    #[test]
    fn test_failures_do_not_stop_the_run() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock)
            .with_interface("can0", vec![response(1), response(2)])
            .with_open_failure("can1", io::ErrorKind::PermissionDenied)
            .with_interface("can2", vec![response(3)]);
        let mut recorder = Recorder::default();

        let summary = run_interfaces(
            &transport,
            &clock,
            ["can0", "missing", "can1", "can2"],
            &mut recorder,
        )
        .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                attempted: 4,
                failed: 2,
                devices: 3
            }
        );
        assert!(!summary.all_succeeded());

        let names: Vec<_> = recorder.outcomes.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(names, vec!["can0", "missing", "can1", "can2"]);
        assert_eq!(recorder.outcomes[0].1, Ok(2));
        assert_eq!(
            recorder.outcomes[1].1,
            Err("Interface missing not found".to_string())
        );
        assert!(recorder.outcomes[2].1.is_err());
        assert_eq!(recorder.outcomes[3].1, Ok(1));
    }

    #[test]
    fn test_sessions_run_sequentially() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock)
            .with_interface("can0", vec![])
            .with_interface("can1", vec![]);
        let mut recorder = Recorder::default();

        run_interfaces(&transport, &clock, vec!["can0".to_string(), "can1".to_string()], &mut recorder)
            .unwrap();

        assert_eq!(clock.elapsed(), Duration::from_secs(4));
        assert_eq!(transport.closed(), vec!["can0".to_string(), "can1".to_string()]);
    }

    #[test]
    fn test_no_interfaces() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(&clock);
        let mut recorder = Recorder::default();

        let err = run_interfaces(&transport, &clock, Vec::<String>::new(), &mut recorder).unwrap_err();
        assert!(matches!(err, DriverError::NoInterfaces));
        assert!(recorder.outcomes.is_empty());
    }
}
