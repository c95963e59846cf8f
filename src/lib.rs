mod client;
mod coordinator;
mod error;
mod extract;
mod metric;
mod monitor;
mod protocol;

pub use client::{StokerClient, StokerClientBuilder};
pub use coordinator::{MetricCoordinator, MetricState};
pub use error::{Error, Result};
pub use extract::{extract, state_label, MetricValue, Selector, Strategy};
pub use metric::{
    default_descriptors, default_setpoints, MetricDescriptor, MetricKind, SetpointSpec,
    DEFAULT_SCAN_INTERVAL,
};
pub use monitor::{SetpointControl, StokerMonitor};
pub use protocol::DEFAULT_BASE_URL;
