use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};
use std::time::Duration;

use crate::catalog::fq_name;
use crate::error::Result;

const COLLECTOR_LABEL: &str = "collector";

/// The status and duration series every stat collector reports about itself.
///
/// Both gauges carry the collector name as a constant label, so the node and
/// virtual-server collectors of one request share the two family names.
#[derive(Clone)]
pub struct ScrapeHealth {
    status: Gauge,
    duration: Gauge,
}

impl ScrapeHealth {
    pub fn new(namespace: &str, collector: &str) -> Result<Self> {
        let status = Gauge::with_opts(
            Opts::new(
                fq_name(&[namespace, "collector_scrape_status"]),
                "1 if the collector fetched its statistics, 0 otherwise",
            )
            .const_label(COLLECTOR_LABEL, collector),
        )?;
        let duration = Gauge::with_opts(
            Opts::new(
                fq_name(&[namespace, "collector_scrape_duration"]),
                "Seconds the collector spent fetching and converting statistics",
            )
            .const_label(COLLECTOR_LABEL, collector),
        )?;
        Ok(Self { status, duration })
    }

    pub fn record(&self, success: bool, elapsed: Duration) {
        self.status.set(if success { 1.0 } else { 0.0 });
        self.duration.set(elapsed.as_secs_f64());
    }
}

impl Collector for ScrapeHealth {
    fn desc(&self) -> Vec<&Desc> {
        self.status.desc().into_iter().chain(self.duration.desc()).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.status.collect();
        families.extend(self.duration.collect());
        families
    }
}
