//! Process-wide series about the exporter itself, merged into every scrape
use chrono::Utc;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::catalog::fq_name;
use crate::error::{ExporterError, Result};

/// Content type of the text exposition format
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// How a scrape request ended, as counted in the request counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Success,
    MissingTarget,
    UnknownTarget,
    Failed,
}

impl ScrapeOutcome {
    const ALL: [ScrapeOutcome; 4] = [
        ScrapeOutcome::Success,
        ScrapeOutcome::MissingTarget,
        ScrapeOutcome::UnknownTarget,
        ScrapeOutcome::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeOutcome::Success => "success",
            ScrapeOutcome::MissingTarget => "missing_target",
            ScrapeOutcome::UnknownTarget => "unknown_target",
            ScrapeOutcome::Failed => "failed",
        }
    }
}

/// Build info, request counters, reload state and process statistics,
/// held in one registry that lives as long as the process
pub struct ExporterMetrics {
    registry: Registry,
    scrapes: IntCounterVec,
    reload_successful: IntGauge,
    reload_success_time: Gauge,
}

impl ExporterMetrics {
    pub fn new(namespace: &str) -> Result<Self> {
        let prefix = fq_name(&[namespace, "exporter"]);
        let name = |suffix: &str| format!("{}_{}", prefix, suffix);
        let registry = Registry::new();

        let build_info = IntGaugeVec::new(
            Opts::new(name("build_info"), "Exporter build information, always 1"),
            &["version"],
        )?;
        build_info.with_label_values(&[crate::VERSION]).set(1);
        registry.register(Box::new(build_info))?;

        let start_time = Gauge::new(name("start_time_seconds"), "Unix time the exporter started")?;
        start_time.set(Utc::now().timestamp() as f64);
        registry.register(Box::new(start_time))?;

        let scrapes = IntCounterVec::new(
            Opts::new(name("scrape_requests_total"), "Scrape requests served, by outcome"),
            &["outcome"],
        )?;
        for outcome in ScrapeOutcome::ALL {
            scrapes.with_label_values(&[outcome.as_str()]);
        }
        registry.register(Box::new(scrapes.clone()))?;

        let reload_successful = IntGauge::new(
            name("config_last_reload_successful"),
            "Whether the last credentials reload succeeded",
        )?;
        registry.register(Box::new(reload_successful.clone()))?;

        let reload_success_time = Gauge::new(
            name("config_last_reload_success_timestamp_seconds"),
            "Unix time of the last successful credentials reload",
        )?;
        registry.register(Box::new(reload_success_time.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            scrapes,
            reload_successful,
            reload_success_time,
        })
    }

    pub fn record_scrape(&self, outcome: ScrapeOutcome) {
        self.scrapes.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn scrape_count(&self, outcome: ScrapeOutcome) -> u64 {
        self.scrapes.with_label_values(&[outcome.as_str()]).get()
    }

    pub fn record_reload(&self, success: bool) {
        self.reload_successful.set(success as i64);
        if success {
            self.reload_success_time.set(Utc::now().timestamp() as f64);
        }
    }

    pub fn last_reload_successful(&self) -> bool {
        self.reload_successful.get() == 1
    }

    /// Current families of the process registry
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Render metric families in the text exposition format
pub fn encode_text(families: &[MetricFamily]) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ExporterError::Other(e.to_string()))
}
