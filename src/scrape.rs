use log::{debug, warn};
use prometheus::Registry;
use std::sync::Arc;

use crate::catalog::MetricCatalog;
use crate::collector::{PartitionFilter, StatCollector};
use crate::credentials::CredentialStore;
use crate::device::DeviceConnector;
use crate::error::{ExporterError, Result};
use crate::exporter::{encode_text, ExporterMetrics, ScrapeOutcome};

/// Turns one scrape request into rendered metrics text
pub struct ScrapeHandler {
    store: Arc<CredentialStore>,
    connector: Arc<dyn DeviceConnector>,
    node_catalog: Arc<MetricCatalog>,
    vs_catalog: Arc<MetricCatalog>,
    partitions: Option<Arc<PartitionFilter>>,
    exporter: Arc<ExporterMetrics>,
}

impl ScrapeHandler {
    pub fn new(
        store: Arc<CredentialStore>,
        connector: Arc<dyn DeviceConnector>,
        namespace: &str,
        partitions: Option<PartitionFilter>,
        exporter: Arc<ExporterMetrics>,
    ) -> Self {
        Self {
            store,
            connector,
            node_catalog: Arc::new(MetricCatalog::node(namespace)),
            vs_catalog: Arc::new(MetricCatalog::virtual_server(namespace)),
            partitions: partitions.map(Arc::new),
            exporter,
        }
    }

    /// Process-wide series merged into every scrape
    pub fn exporter(&self) -> &ExporterMetrics {
        &self.exporter
    }

    /// Resolve, fetch and render one target.
    ///
    /// Device failures do not fail the scrape; they show up as a zero scrape
    /// status for the affected collector.
    pub async fn handle_scrape(&self, target: &str) -> Result<String> {
        let result = self.scrape(target).await;
        self.exporter.record_scrape(match &result {
            Ok(_) => ScrapeOutcome::Success,
            Err(ExporterError::MissingTarget) => ScrapeOutcome::MissingTarget,
            Err(ExporterError::NoCredentials(_)) => ScrapeOutcome::UnknownTarget,
            Err(_) => ScrapeOutcome::Failed,
        });
        result
    }

    async fn scrape(&self, target: &str) -> Result<String> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ExporterError::MissingTarget);
        }
        debug!("Scraping target '{}'", target);

        let credentials = self
            .store
            .resolve(target)
            .inspect_err(|e| warn!("Rejecting scrape of '{}': {}", target, e))?;

        let device = self.connector.connect(target, &credentials);

        // fresh collectors and registry per request
        let registry = Registry::new();
        for catalog in [&self.node_catalog, &self.vs_catalog] {
            let collector = StatCollector::new(device.clone(), catalog.clone(), self.partitions.clone())?;
            collector.scrape().await;
            registry.register(Box::new(collector))?;
        }

        let mut families = self.exporter.gather();
        families.extend(registry.gather());
        encode_text(&families)
    }
}
