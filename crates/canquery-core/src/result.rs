//! Discovery results collected from one interface

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::device::{ApplicationKind, DeviceUuid, DiscoveredDevice};

/// Nodes found on one interface during a single query/collect cycle.
/// Devices are kept in the order they first answered.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResult {
    interface: String,
    started_at: DateTime<Utc>,
    devices: Vec<DiscoveredDevice>,
}

impl DiscoveryResult {
    /// Interface the result was collected from
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// When the collection window opened
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredDevice> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, uuid: DeviceUuid) -> bool {
        self.get(uuid).is_some()
    }

    /// Classification recorded for a uuid
    pub fn get(&self, uuid: DeviceUuid) -> Option<ApplicationKind> {
        self.devices
            .iter()
            .find(|d| d.uuid == uuid)
            .map(|d| d.application)
    }
}

/// Accumulates responses for a session; the first answer from a uuid wins
#[derive(Debug)]
pub struct ResultCollector {
    interface: String,
    started_at: DateTime<Utc>,
    seen: HashSet<DeviceUuid>,
    devices: Vec<DiscoveredDevice>,
}

impl ResultCollector {
    pub fn new(interface: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            interface: interface.into(),
            started_at,
            seen: HashSet::new(),
            devices: Vec::new(),
        }
    }

    /// Record a device. Returns false, leaving state untouched, if the uuid
    /// was already recorded.
    pub fn record(&mut self, uuid: DeviceUuid, application: ApplicationKind) -> bool {
        if !self.seen.insert(uuid) {
            return false;
        }
        self.devices.push(DiscoveredDevice { uuid, application });
        true
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn finish(self) -> DiscoveryResult {
        DiscoveryResult {
            interface: self.interface,
            started_at: self.started_at,
            devices: self.devices,
        }
    }
}
