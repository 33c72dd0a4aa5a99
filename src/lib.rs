//! A multi-target Prometheus exporter for BIG-IP load balancers

pub mod catalog;
pub mod collector;
pub mod config;
pub mod credentials;
pub mod device;
pub mod error;
pub mod exporter;
pub mod reload;
pub mod scrape;
pub mod server;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::catalog::{MetricCatalog, ObjectKind};
    pub use crate::collector::{PartitionFilter, StatCollector};
    pub use crate::config::{AuthMode, ConfigSource};
    pub use crate::credentials::{CredentialStore, Credentials};
    pub use crate::device::{DeviceApi, DeviceConnector, Stats};
    pub use crate::error::{ExporterError, Result};
    pub use crate::exporter::ExporterMetrics;
    pub use crate::reload::{ReloadHandle, ReloadWorker};
    pub use crate::scrape::ScrapeHandler;
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
