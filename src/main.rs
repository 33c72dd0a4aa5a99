use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bigip_exporter::collector::PartitionFilter;
use bigip_exporter::config::{ConfigSource, LogLevel};
use bigip_exporter::credentials::CredentialStore;
use bigip_exporter::device::{BigIpConnector, DeviceSettings};
use bigip_exporter::exporter::ExporterMetrics;
use bigip_exporter::reload::{spawn_signal_listener, ReloadWorker};
use bigip_exporter::scrape::ScrapeHandler;
use bigip_exporter::server::{router, AppState};
use bigip_exporter::util::logging;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "bigip-exporter", about = "Prometheus exporter for BIG-IP load balancers", version)]
struct Args {
    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9142")]
    listen_address: String,

    /// Path under which to expose scraped target metrics
    #[arg(long = "web.telemetry-path", default_value = "/bigip")]
    metric_path: String,

    /// Path to the credentials file
    #[arg(long = "config.file", default_value = "bigip-exporter.yml")]
    config_file: PathBuf,

    /// Prefix of every exported series
    #[arg(long = "exporter.namespace", default_value = "bigip")]
    namespace: String,

    /// Comma separated partitions to export; all partitions when empty
    #[arg(long = "exporter.partitions", default_value = "")]
    partitions: String,

    /// Appliance request timeout in seconds
    #[arg(long = "device.timeout", default_value = "30")]
    device_timeout: u64,

    /// Accept self-signed appliance certificates
    #[arg(long = "device.insecure", default_value = "true", action = clap::ArgAction::Set)]
    device_insecure: bool,

    /// Log level
    #[arg(long = "log.level", value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    if !args.metric_path.starts_with('/') {
        bail!("--web.telemetry-path must start with '/': {}", args.metric_path);
    }

    info!("Starting bigip_exporter {}", bigip_exporter::VERSION);

    let source = ConfigSource::File(args.config_file.clone());
    let store = Arc::new(CredentialStore::new());
    store
        .reload(&source)
        .with_context(|| format!("Error parsing config file {}", args.config_file.display()))?;

    let metrics = Arc::new(ExporterMetrics::new(&args.namespace).context("Failed to register exporter metrics")?);
    metrics.record_reload(true);

    let connector = BigIpConnector::new(&DeviceSettings {
        timeout: Duration::from_secs(args.device_timeout),
        accept_invalid_certs: args.device_insecure,
    })
    .context("Failed to build appliance HTTP client")?;

    let partitions = PartitionFilter::parse(&args.partitions);
    if partitions.is_some() {
        info!("Exporting partitions: {}", args.partitions);
    }

    let scraper = Arc::new(ScrapeHandler::new(
        store.clone(),
        Arc::new(connector),
        &args.namespace,
        partitions,
        metrics.clone(),
    ));

    let (reloader, _worker) = ReloadWorker::new(store, source, metrics).spawn(8);
    let _signals = spawn_signal_listener(reloader.clone()).context("Failed to install SIGHUP handler")?;

    let app = router(AppState::new(scraper, reloader, &args.metric_path), &args.metric_path);

    let listener = tokio::net::TcpListener::bind(&args.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_address))?;
    info!("Listening on {}", args.listen_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
