//! canquery discovery - Query CAN buses for nodes without a node id
//!
//! This crate runs the discovery protocol:
//! - Bus channel traits with a SocketCAN implementation (Linux)
//! - A single broadcast followed by a fixed 2 second collection window
//! - Sequential per-interface driving with pluggable reporting
//! - A scripted transport and simulated clock for deterministic testing
//!   (`sim` feature)

pub mod bus;
pub mod clock;
pub mod driver;
pub mod interfaces;
pub mod session;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan_bus;

pub use bus::{BusChannel, BusError, BusTransport};
pub use clock::{Clock, SystemClock};
pub use driver::{run_interfaces, DriverError, Reporter, RunSummary};
pub use interfaces::{list_can_interfaces, DEFAULT_INTERFACE_PREFIX, DEFAULT_SYSFS_NET};
pub use session::{DiscoverySession, SessionState, COLLECTION_WINDOW};

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub use socketcan_bus::{SocketCanChannel, SocketCanTransport};
