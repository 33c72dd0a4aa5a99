use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use bigip_exporter::collector::PartitionFilter;
use bigip_exporter::config::ConfigSource;
use bigip_exporter::credentials::{CredentialStore, Credentials};
use bigip_exporter::device::{DeviceApi, DeviceConnector, StatField, StatRecord, Stats};
use bigip_exporter::error::Result;
use bigip_exporter::exporter::ExporterMetrics;
use bigip_exporter::scrape::ScrapeHandler;

/// Serves objects named after the credentials user, so responses reveal whose device produced them
struct TaggedDevice {
    tag: String,
}

impl TaggedDevice {
    async fn objects(&self, kind: &str) -> Result<Stats> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        let mut stats = Stats::new();
        for partition in ["Common", "Tenant"] {
            for i in 0..3 {
                let mut record = StatRecord::new();
                record.insert("totRequests".to_string(), StatField::value(i as f64));
                record.insert("status.availabilityState".to_string(), StatField::description("available"));
                stats.insert(
                    format!(
                        "https://localhost/mgmt/tm/ltm/{}/~{}~{}-{}{}/stats",
                        kind, partition, self.tag, kind, i
                    ),
                    record,
                );
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl DeviceApi for TaggedDevice {
    async fn fetch_node_stats(&self) -> Result<Stats> {
        self.objects("node").await
    }

    async fn fetch_virtual_server_stats(&self) -> Result<Stats> {
        self.objects("virtual").await
    }
}

struct TaggedConnector;

impl DeviceConnector for TaggedConnector {
    fn connect(&self, _target: &str, credentials: &Credentials) -> Arc<dyn DeviceApi> {
        Arc::new(TaggedDevice {
            tag: credentials.user.clone(),
        })
    }
}

const CONFIG: &str = r#"
targets:
  - pattern: "alpha.example.com"
    user: alpha
    password: a
    auth_mode: basic
  - pattern: "beta.example.com"
    user: beta
    password: b
"#;

fn handler(partitions: Option<PartitionFilter>) -> Arc<ScrapeHandler> {
    let store = CredentialStore::new();
    store.reload(&ConfigSource::Yaml(CONFIG.to_string())).unwrap();
    Arc::new(ScrapeHandler::new(
        Arc::new(store),
        Arc::new(TaggedConnector),
        "bigip",
        partitions,
        Arc::new(ExporterMetrics::new("bigip").unwrap()),
    ))
}

/// Object label values of every catalog series in a rendered body
fn object_names(body: &str) -> Vec<String> {
    body.lines()
        .filter(|l| l.starts_with("bigip_node_") || l.starts_with("bigip_vs_"))
        .filter_map(|l| {
            let start = l.find("node=\"").or_else(|| l.find("vs=\""))?;
            let rest = &l[start..];
            let open = rest.find('"')? + 1;
            let close = rest[open..].find('"')?;
            Some(rest[open..open + close].to_string())
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scrapes_stay_isolated() {
    let handler = handler(None);

    let mut tasks = Vec::new();
    for i in 0..100 {
        let handler = handler.clone();
        let (target, tag) = if i % 2 == 0 {
            ("alpha.example.com", "alpha")
        } else {
            ("beta.example.com", "beta")
        };
        tasks.push(tokio::spawn(async move {
            let body = handler.handle_scrape(target).await.unwrap();
            (tag, body)
        }));
    }

    for task in tasks {
        let (tag, body) = task.await.unwrap();
        let names = object_names(&body);
        // 6 nodes x 10 series + 6 virtual servers x 35 series
        assert_eq!(names.len(), 6 * 10 + 6 * 35);
        for name in names {
            assert!(name.starts_with(&format!("{}-", tag)), "{} leaked into {} scrape", name, tag);
        }
    }
}

#[tokio::test]
async fn partition_filter_applies_to_both_collectors() {
    let handler = handler(PartitionFilter::parse("Tenant"));
    let body = handler.handle_scrape("alpha.example.com").await.unwrap();

    assert_eq!(object_names(&body).len(), 3 * 10 + 3 * 35);
    assert!(!body.contains("partition=\"Common\""));
    assert!(body.contains("bigip_collector_scrape_status{collector=\"node\"} 1"));
    assert!(body.contains("bigip_collector_scrape_status{collector=\"vs\"} 1"));
}
