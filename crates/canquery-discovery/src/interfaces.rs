//! Host CAN interface enumeration

use std::path::Path;
use tracing::{debug, warn};

/// Kernel directory listing every network interface
pub const DEFAULT_SYSFS_NET: &str = "/sys/class/net";

/// Name prefix of CAN interfaces
pub const DEFAULT_INTERFACE_PREFIX: &str = "can";

/// List network interfaces whose name starts with `prefix`, sorted by name.
///
/// An unreadable directory is logged and treated as "no interfaces".
pub fn list_can_interfaces(sysfs_net: &Path, prefix: &str) -> Vec<String> {
    let entries = match std::fs::read_dir(sysfs_net) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                path = %sysfs_net.display(),
                error = %e,
                "Cannot list network interfaces, assuming no CAN interfaces"
            );
            return Vec::new();
        }
    };

    let mut interfaces: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix))
        .collect();
    interfaces.sort();

    debug!("Found {} CAN interfaces", interfaces.len());
    interfaces
}
