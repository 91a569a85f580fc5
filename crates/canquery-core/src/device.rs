//! Device identifiers and firmware classification for unassigned CAN nodes

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Application id reported by Klipper firmware
pub const APP_ID_KLIPPER: u8 = 0x01;

/// Application id reported by the CanBoot bootloader
pub const APP_ID_CANBOOT: u8 = 0x11;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceUuidError {
    #[error("invalid hex uuid: {0}")]
    InvalidHex(String),
    #[error("uuid {0:#x} does not fit in 48 bits")]
    OutOfRange(u64),
}

/// 48-bit factory-unique identifier a node reports before it has a node id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceUuid(u64);

impl DeviceUuid {
    /// Largest representable uuid
    pub const MAX: u64 = (1 << 48) - 1;

    /// Pack six bytes, most significant first
    pub fn from_be_bytes(bytes: [u8; 6]) -> Self {
        Self(
            bytes
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        )
    }

    pub fn to_be_bytes(self) -> [u8; 6] {
        let mut out = [0u8; 6];
        out.copy_from_slice(&self.0.to_be_bytes()[2..]);
        out
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for DeviceUuid {
    type Error = DeviceUuidError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(DeviceUuidError::OutOfRange(value));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

impl FromStr for DeviceUuid {
    type Err = DeviceUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let value = u64::from_str_radix(digits, 16)
            .map_err(|_| DeviceUuidError::InvalidHex(s.to_string()))?;
        Self::try_from(value)
    }
}

impl Serialize for DeviceUuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceUuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Firmware family running on a responding node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationKind {
    /// Normal Klipper firmware
    #[serde(rename = "Klipper")]
    PrimaryFirmware,
    /// CanBoot bootloader
    #[serde(rename = "CanBoot")]
    BootloaderFirmware,
    /// Any other application id
    Unknown,
}

impl ApplicationKind {
    /// Classify an optional application id byte.
    /// Responses without the byte predate it and come from Klipper.
    pub fn from_app_id(app_id: Option<u8>) -> Self {
        match app_id.unwrap_or(APP_ID_KLIPPER) {
            APP_ID_KLIPPER => Self::PrimaryFirmware,
            APP_ID_CANBOOT => Self::BootloaderFirmware,
            _ => Self::Unknown,
        }
    }

    /// Name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryFirmware => "Klipper",
            Self::BootloaderFirmware => "CanBoot",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node found during one discovery session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub uuid: DeviceUuid,
    pub application: ApplicationKind,
}
