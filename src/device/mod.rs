//! Seam between the scrape pipeline and the appliance API
mod bigip;

pub use bigip::{BigIpConnector, BigIpDevice, DeviceSettings};

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::credentials::Credentials;
use crate::error::Result;

/// A single named statistic of an object
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StatField {
    /// Numeric reading
    #[serde(default)]
    pub value: Option<f64>,
    /// Textual reading such as an availability state
    #[serde(default)]
    pub description: Option<String>,
}

impl StatField {
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            description: None,
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            value: None,
            description: Some(description.into()),
        }
    }
}

/// Flat statistics of one object, keyed by field name
pub type StatRecord = HashMap<String, StatField>;

/// All objects of one kind, keyed by their object path
pub type Stats = BTreeMap<String, StatRecord>;

/// Statistics calls a device handle offers
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn fetch_node_stats(&self) -> Result<Stats>;

    async fn fetch_virtual_server_stats(&self) -> Result<Stats>;
}

/// Builds device handles for a resolved target
pub trait DeviceConnector: Send + Sync {
    /// Must not perform network I/O
    fn connect(&self, target: &str, credentials: &Credentials) -> Arc<dyn DeviceApi>;
}

/// Split an object path into `(partition, object name)`.
///
/// Paths look like `https://localhost/mgmt/tm/ltm/node/~Common~node1/stats`.
/// The last `/` segment holding a `~` carries the object; its second `~` field
/// is the partition and its last field the object name.
pub fn split_object_path(path: &str) -> Option<(&str, &str)> {
    let segment = path.split('/').rev().find(|s| s.contains('~'))?;
    let parts: Vec<&str> = segment.split('~').collect();
    let partition = *parts.get(1)?;
    let name = *parts.last()?;
    if partition.is_empty() || name.is_empty() {
        return None;
    }
    Some((partition, name))
}
