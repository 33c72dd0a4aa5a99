//! HTTP routes: scrape, reload, process metrics and landing page
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use log::error;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ExporterError;
use crate::exporter::{encode_text, TEXT_CONTENT_TYPE};
use crate::reload::ReloadHandle;
use crate::scrape::ScrapeHandler;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<ScrapeHandler>,
    pub reloader: ReloadHandle,
    landing_page: Arc<String>,
}

impl AppState {
    pub fn new(scraper: Arc<ScrapeHandler>, reloader: ReloadHandle, metric_path: &str) -> Self {
        Self {
            scraper,
            reloader,
            landing_page: Arc::new(landing_page(metric_path)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    #[serde(default)]
    target: String,
}

fn landing_page(metric_path: &str) -> String {
    format!(
        "<html>\n<head><title>BigIP exporter</title></head>\n<body>\n<h1>BigIP exporter</h1>\n\
         <p><a href='{0}'>Metrics</a></p>\n</body>\n</html>\n",
        metric_path
    )
}

fn status_for(err: &ExporterError) -> StatusCode {
    match err {
        ExporterError::MissingTarget => StatusCode::BAD_REQUEST,
        ExporterError::NoCredentials(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn metrics_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response()
}

async fn handle_scrape(State(state): State<AppState>, Query(params): Query<ScrapeParams>) -> Response {
    match state.scraper.handle_scrape(&params.target).await {
        Ok(body) => metrics_response(body),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

async fn handle_reload(State(state): State<AppState>, method: Method) -> Response {
    if method != Method::POST {
        error!("POST method expected");
        return (StatusCode::BAD_REQUEST, "POST method expected").into_response();
    }

    match state.reloader.reload().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to reload config: {}", e),
        )
            .into_response(),
    }
}

async fn handle_metrics(State(state): State<AppState>) -> Response {
    match encode_text(&state.scraper.exporter().gather()) {
        Ok(body) => metrics_response(body),
        Err(e) => {
            error!("Failed to encode process metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn handle_landing(State(state): State<AppState>) -> Html<String> {
    Html(state.landing_page.as_ref().clone())
}

/// Build the router, mounting the scrape handler at `metric_path`
pub fn router(state: AppState, metric_path: &str) -> Router {
    Router::new()
        .route(metric_path, get(handle_scrape))
        .route("/-/reload", any(handle_reload))
        .route("/metrics", get(handle_metrics))
        .route("/", get(handle_landing))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;
    use crate::credentials::{CredentialStore, Credentials};
    use crate::device::{DeviceApi, DeviceConnector, Stats};
    use crate::error::Result;
    use crate::exporter::ExporterMetrics;
    use crate::reload::ReloadWorker;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    struct EmptyDevice;

    #[async_trait::async_trait]
    impl DeviceApi for EmptyDevice {
        async fn fetch_node_stats(&self) -> Result<Stats> {
            Ok(Stats::new())
        }

        async fn fetch_virtual_server_stats(&self) -> Result<Stats> {
            Ok(Stats::new())
        }
    }

    struct EmptyConnector;

    impl DeviceConnector for EmptyConnector {
        fn connect(&self, _target: &str, _credentials: &Credentials) -> Arc<dyn DeviceApi> {
            Arc::new(EmptyDevice)
        }
    }

    fn app(config: &NamedTempFile) -> Router {
        let store = Arc::new(CredentialStore::new());
        let source = ConfigSource::File(config.path().to_path_buf());
        store.reload(&source).unwrap();
        let metrics = Arc::new(ExporterMetrics::new("bigip").unwrap());
        let (reloader, _task) = ReloadWorker::new(store.clone(), source, metrics.clone()).spawn(4);
        let scraper = Arc::new(ScrapeHandler::new(store, Arc::new(EmptyConnector), "bigip", None, metrics));
        router(AppState::new(scraper, reloader, "/bigip"), "/bigip")
    }

    fn config_file() -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        writeln!(file, "targets:\n  - pattern: lb01\n    user: admin").unwrap();
        file
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_status_codes() {
        let file = config_file();
        let (status, body) = call(app(&file), Method::GET, "/bigip").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("'target' parameter must be specified"));

        let (status, body) = call(app(&file), Method::GET, "/bigip?target=lb99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "unknown target 'lb99'");

        let (status, body) = call(app(&file), Method::GET, "/bigip?target=lb01").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("bigip_collector_scrape_status{collector=\"vs\"} 1"));
    }

    #[tokio::test]
    async fn test_reload_requires_post() {
        let file = config_file();
        let (status, body) = call(app(&file), Method::GET, "/-/reload").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "POST method expected");

        let (status, _) = call(app(&file), Method::POST, "/-/reload").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_landing_page_links_metric_path() {
        let file = config_file();
        let (status, body) = call(app(&file), Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href='/bigip'"));

        let (status, body) = call(app(&file), Method::GET, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("bigip_exporter_build_info"));
        assert!(!body.contains("bigip_collector_scrape_status"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_runtime_statistics_on_every_endpoint() {
        let file = config_file();
        let (_, body) = call(app(&file), Method::GET, "/metrics").await;
        assert!(body.contains("process_cpu_seconds_total"));

        let (_, body) = call(app(&file), Method::GET, "/bigip?target=lb01").await;
        assert!(body.contains("process_cpu_seconds_total"));
        assert!(body.contains("bigip_exporter_scrape_requests_total"));
    }
}
