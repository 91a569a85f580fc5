//! Console reporters for discovery results

use canquery_core::{DiscoveredDevice, DiscoveryResult};
use canquery_discovery::{BusError, Reporter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use tracing::warn;

/// Human-readable report: one line per node and a total per interface
pub struct TextReporter<W, E> {
    out: W,
    err: E,
}

impl<W: Write, E: Write> TextReporter<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self { out, err }
    }

    fn write_result(&mut self, interface: &str, result: &DiscoveryResult) -> io::Result<()> {
        for device in result.iter() {
            writeln!(
                self.out,
                "[{}] Found canbus_uuid={}, Application: {}",
                interface, device.uuid, device.application
            )?;
        }
        writeln!(self.out, "Total {} uuids found", result.len())?;
        self.out.flush()
    }

    fn write_error(&mut self, interface: &str, error: &BusError) -> io::Result<()> {
        match error {
            BusError::DeviceNotFound { .. } => writeln!(self.err, "Interface {} not found!", interface),
            BusError::Transport { source, .. } => writeln!(self.err, "[{}] error: {}", interface, source),
        }
    }
}

impl<W: Write, E: Write> Reporter for TextReporter<W, E> {
    fn report(&mut self, interface: &str, outcome: Result<&DiscoveryResult, &BusError>) {
        let written = match outcome {
            Ok(result) => self.write_result(interface, result),
            Err(error) => self.write_error(interface, error),
        };
        if let Err(e) = written {
            warn!(interface = %interface, error = %e, "Failed to write report");
        }
    }
}

#[derive(Serialize)]
struct InterfaceReport<'a> {
    interface: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    devices: &'a [DiscoveredDevice],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Machine-readable report: one JSON object per interface per line
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_report(&mut self, report: &InterfaceReport<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, report)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report(&mut self, interface: &str, outcome: Result<&DiscoveryResult, &BusError>) {
        let report = match outcome {
            Ok(result) => InterfaceReport {
                interface,
                started_at: Some(result.started_at()),
                devices: result.devices(),
                error: None,
            },
            Err(error) => InterfaceReport {
                interface,
                started_at: None,
                devices: &[],
                error: Some(error.to_string()),
            },
        };
        if let Err(e) = self.write_report(&report) {
            warn!(interface = %interface, error = %e, "Failed to write report");
        }
    }
}
