use log::{debug, warn};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::health::ScrapeHealth;
use crate::catalog::{MetricCatalog, MetricDefinition, MetricKind, ObjectKind};
use crate::device::{split_object_path, DeviceApi, Stats};
use crate::error::Result;

/// Set of partitions whose objects are exported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionFilter {
    allowed: HashSet<String>,
}

impl PartitionFilter {
    /// Returns `None` for an empty list, which means every partition is exported
    pub fn new<I, S>(partitions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: HashSet<String> = partitions
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        if allowed.is_empty() {
            None
        } else {
            Some(Self { allowed })
        }
    }

    /// Parse a comma separated list such as `Common,Tenant1`
    pub fn parse(list: &str) -> Option<Self> {
        Self::new(list.split(',').map(str::trim))
    }

    pub fn allows(&self, partition: &str) -> bool {
        self.allowed.contains(partition)
    }
}

/// One vector of series per catalog entry
enum SeriesVec {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

impl SeriesVec {
    fn new(definition: &MetricDefinition, label_names: &[&str]) -> Result<Self> {
        let opts = Opts::new(definition.name.clone(), definition.help);
        Ok(match definition.kind {
            MetricKind::Counter => SeriesVec::Counter(CounterVec::new(opts, label_names)?),
            MetricKind::Gauge => SeriesVec::Gauge(GaugeVec::new(opts, label_names)?),
        })
    }

    fn set(&self, label_values: &[&str], value: f64) {
        match self {
            SeriesVec::Counter(vec) => {
                // counters only move forward; the appliance total is absolute
                let counter = vec.with_label_values(label_values);
                counter.reset();
                counter.inc_by(value.max(0.0));
            }
            SeriesVec::Gauge(vec) => vec.with_label_values(label_values).set(value),
        }
    }

    fn desc(&self) -> Vec<&Desc> {
        match self {
            SeriesVec::Counter(vec) => vec.desc(),
            SeriesVec::Gauge(vec) => vec.desc(),
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self {
            SeriesVec::Counter(vec) => vec.collect(),
            SeriesVec::Gauge(vec) => vec.collect(),
        }
    }
}

/// Fetches one kind of object from a device and exposes a series per catalog entry.
///
/// A collector is built for a single scrape: [`StatCollector::scrape`] runs the
/// fetch, after which the collector is registered and gathered.
pub struct StatCollector {
    device: Arc<dyn DeviceApi>,
    catalog: Arc<MetricCatalog>,
    partitions: Option<Arc<PartitionFilter>>,
    series: Vec<SeriesVec>,
    health: ScrapeHealth,
}

impl StatCollector {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        catalog: Arc<MetricCatalog>,
        partitions: Option<Arc<PartitionFilter>>,
    ) -> Result<Self> {
        let label_names = catalog.label_names();
        let series = catalog
            .describe()
            .iter()
            .map(|definition| SeriesVec::new(definition, &label_names))
            .collect::<Result<Vec<_>>>()?;
        let health = ScrapeHealth::new(catalog.namespace(), catalog.kind().collector_label())?;

        Ok(Self {
            device,
            catalog,
            partitions,
            series,
            health,
        })
    }

    async fn fetch(&self) -> Result<Stats> {
        match self.catalog.kind() {
            ObjectKind::Node => self.device.fetch_node_stats().await,
            ObjectKind::VirtualServer => self.device.fetch_virtual_server_stats().await,
        }
    }

    /// Fetch statistics and fill the series. Failures are logged and only
    /// show up in the scrape status.
    pub async fn scrape(&self) {
        let kind = self.catalog.kind();
        let start = Instant::now();

        let success = match self.fetch().await {
            Ok(stats) => {
                self.observe(&stats);
                debug!("Successfully fetched statistics for {}", kind);
                true
            }
            Err(e) => {
                warn!("Failed to get statistics for {} ({})", kind, e);
                false
            }
        };

        let elapsed = start.elapsed();
        self.health.record(success, elapsed);
        debug!("Getting {} statistics took {:?}", kind, elapsed);
    }

    fn observe(&self, stats: &Stats) {
        for (path, record) in stats {
            let Some((partition, object)) = split_object_path(path) else {
                debug!("Skipping stats entry with unrecognised path {}", path);
                continue;
            };

            if let Some(filter) = &self.partitions {
                if !filter.allows(partition) {
                    continue;
                }
            }

            for (definition, series) in self.catalog.describe().iter().zip(&self.series) {
                series.set(&[partition, object], self.catalog.extract(record, definition));
            }
        }
    }
}

impl Collector for StatCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = self.series.iter().flat_map(SeriesVec::desc).collect();
        descs.extend(self.health.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families: Vec<MetricFamily> = self.series.iter().flat_map(SeriesVec::collect).collect();
        families.extend(self.health.collect());
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{StatField, StatRecord};
    use crate::error::ExporterError;
    use crate::exporter::encode_text;
    use async_trait::async_trait;
    use prometheus::Registry;

    struct FakeDevice {
        stats: Option<Stats>,
    }

    #[async_trait]
    impl DeviceApi for FakeDevice {
        async fn fetch_node_stats(&self) -> Result<Stats> {
            self.stats
                .clone()
                .ok_or_else(|| ExporterError::Device("connection refused".to_string()))
        }

        async fn fetch_virtual_server_stats(&self) -> Result<Stats> {
            Err(ExporterError::Device("virtual servers are not served here".to_string()))
        }
    }

    fn stats(objects: &[(&str, &str)]) -> Stats {
        objects
            .iter()
            .map(|(partition, name)| {
                let mut record = StatRecord::new();
                record.insert("serverside.bitsIn".to_string(), StatField::value(800.0));
                record.insert("status.availabilityState".to_string(), StatField::description("available"));
                (
                    format!("https://localhost/mgmt/tm/ltm/node/~{}~{}/stats", partition, name),
                    record,
                )
            })
            .collect()
    }

    fn collector(stats: Option<Stats>, partitions: Option<PartitionFilter>) -> StatCollector {
        StatCollector::new(
            Arc::new(FakeDevice { stats }),
            Arc::new(MetricCatalog::new("bigip", ObjectKind::Node)),
            partitions.map(Arc::new),
        )
        .unwrap()
    }

    /// Scrape, register and render, returning the sample lines
    async fn sample_lines(collector: StatCollector) -> Vec<String> {
        collector.scrape().await;
        let registry = Registry::new();
        registry.register(Box::new(collector)).unwrap();
        encode_text(&registry.gather())
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_failure_emits_only_health() {
        let lines = sample_lines(collector(None, None)).await;
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"bigip_collector_scrape_status{collector=\"node\"} 0".to_string()));
        assert!(lines.iter().all(|l| l.starts_with("bigip_collector_scrape_")));
    }

    #[tokio::test]
    async fn test_success_emits_catalog_for_each_object() {
        let c = collector(Some(stats(&[("Common", "n1"), ("Common", "n2"), ("Other", "n3")])), None);
        let lines = sample_lines(c).await;
        assert_eq!(lines.len(), 3 * 10 + 2);
        assert!(lines.contains(&"bigip_collector_scrape_status{collector=\"node\"} 1".to_string()));

        let bytes = lines
            .iter()
            .find(|l| l.starts_with("bigip_node_serverside_bytes_received_total{") && l.contains("node=\"n3\""))
            .unwrap();
        assert!(bytes.contains("partition=\"Other\""));
        assert!(bytes.ends_with(" 100"), "{}", bytes);
    }

    #[tokio::test]
    async fn test_partition_filter_skips_objects() {
        let c = collector(
            Some(stats(&[("Common", "n1"), ("Common", "n2"), ("Other", "n3")])),
            PartitionFilter::parse("Common"),
        );
        let lines = sample_lines(c).await;
        assert_eq!(lines.len(), 2 * 10 + 2);
        assert!(lines.iter().all(|l| !l.contains("partition=\"Other\"")));
    }

    #[tokio::test]
    async fn test_collected_families_are_described() {
        let c = collector(Some(stats(&[("Common", "n1")])), None);
        c.scrape().await;
        let described: HashSet<String> = c.desc().iter().map(|d| d.fq_name.clone()).collect();
        assert_eq!(described.len(), 12);
        for family in c.collect() {
            assert!(described.contains(family.get_name()), "{} not described", family.get_name());
        }
    }

    #[tokio::test]
    async fn test_fetch_follows_catalog_kind() {
        let c = StatCollector::new(
            Arc::new(FakeDevice {
                stats: Some(stats(&[("Common", "n1")])),
            }),
            Arc::new(MetricCatalog::virtual_server("bigip")),
            None,
        )
        .unwrap();
        let lines = sample_lines(c).await;
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"bigip_collector_scrape_status{collector=\"vs\"} 0".to_string()));
    }

    #[test]
    fn test_empty_partition_list_disables_filter() {
        assert!(PartitionFilter::parse("").is_none());
        assert!(PartitionFilter::parse(" , ").is_none());
        let filter = PartitionFilter::parse("Common, Tenant").unwrap();
        assert!(filter.allows("Tenant"));
        assert!(!filter.allows("tenant"));
    }
}
