//! Tables describing how raw appliance statistics become named time series
mod node;
mod virtual_server;

use std::fmt;

use crate::device::StatRecord;

/// The literal the appliance reports for a healthy object
pub const AVAILABLE: &str = "available";

/// Prometheus metric type of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// How a value is read out of a raw stat record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// Numeric field taken as is
    Value(&'static str),
    /// Bit counter reported as bytes
    Bytes(&'static str),
    /// Description field compared against [`AVAILABLE`]
    Available(&'static str),
}

impl Extractor {
    /// Absent or non-numeric fields read as zero.
    pub fn extract(&self, record: &StatRecord) -> f64 {
        match *self {
            Extractor::Value(field) => numeric(record, field),
            Extractor::Bytes(field) => (numeric(record, field) / 8.0).trunc(),
            Extractor::Available(field) => {
                let available = record
                    .get(field)
                    .and_then(|f| f.description.as_deref())
                    .is_some_and(|d| d == AVAILABLE);
                if available { 1.0 } else { 0.0 }
            }
        }
    }
}

fn numeric(record: &StatRecord, field: &str) -> f64 {
    record
        .get(field)
        .and_then(|f| f.value)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// A static catalog row, before the namespace is applied
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetricSpec {
    pub key: &'static str,
    pub suffix: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub extractor: Extractor,
}

/// One named, typed series produced for every object
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    /// Catalog-unique key, the raw field name it is derived from
    pub key: &'static str,
    /// Fully qualified series name
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub extractor: Extractor,
}

impl MetricDefinition {
    pub fn extract(&self, record: &StatRecord) -> f64 {
        self.extractor.extract(record)
    }
}

/// The category of polled appliance object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Node,
    VirtualServer,
}

impl ObjectKind {
    /// Series name component
    pub fn subsystem(&self) -> &'static str {
        match self {
            ObjectKind::Node => "node",
            ObjectKind::VirtualServer => "vs",
        }
    }

    /// Label carrying the object name
    pub fn object_label(&self) -> &'static str {
        self.subsystem()
    }

    /// Value of the `collector` label on health samples
    pub fn collector_label(&self) -> &'static str {
        self.subsystem()
    }

    fn specs(&self) -> &'static [MetricSpec] {
        match self {
            ObjectKind::Node => node::METRICS,
            ObjectKind::VirtualServer => virtual_server::METRICS,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Node => write!(f, "nodes"),
            ObjectKind::VirtualServer => write!(f, "virtual servers"),
        }
    }
}

/// Join non-empty name components with underscores
pub fn fq_name(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// The metric table for one object kind, built once per process
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    namespace: String,
    kind: ObjectKind,
    definitions: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn new(namespace: impl Into<String>, kind: ObjectKind) -> Self {
        let namespace = namespace.into();
        let definitions = kind
            .specs()
            .iter()
            .map(|spec| MetricDefinition {
                key: spec.key,
                name: fq_name(&[namespace.as_str(), kind.subsystem(), spec.suffix]),
                help: spec.help,
                kind: spec.kind,
                extractor: spec.extractor,
            })
            .collect();

        Self {
            namespace,
            kind,
            definitions,
        }
    }

    pub fn node(namespace: impl Into<String>) -> Self {
        Self::new(namespace, ObjectKind::Node)
    }

    pub fn virtual_server(namespace: impl Into<String>) -> Self {
        Self::new(namespace, ObjectKind::VirtualServer)
    }

    /// Every series this catalog can emit
    pub fn describe(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    pub fn extract(&self, record: &StatRecord, definition: &MetricDefinition) -> f64 {
        definition.extract(record)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Label names for catalog series, partition first
    pub fn label_names(&self) -> [&'static str; 2] {
        ["partition", self.kind.object_label()]
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
