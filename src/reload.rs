//! Serialized credentials reloads, fed by signals and HTTP requests
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::ConfigSource;
use crate::credentials::CredentialStore;
use crate::error::{ExporterError, Result};
use crate::exporter::ExporterMetrics;

/// What asked for a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Signal,
    Request,
}

struct ReloadRequest {
    trigger: Trigger,
    reply: Option<oneshot::Sender<Result<()>>>,
}

/// Cloneable producer side of the reload worker
#[derive(Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<ReloadRequest>,
}

impl ReloadHandle {
    /// Queue a reload and wait for its outcome
    pub async fn reload(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ReloadRequest {
                trigger: Trigger::Request,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| ExporterError::Channel("reload worker stopped".to_string()))?;
        reply_rx.await?
    }

    /// Queue a reload without waiting; the outcome is only logged
    pub fn notify(&self) {
        let request = ReloadRequest {
            trigger: Trigger::Signal,
            reply: None,
        };
        if let Err(e) = self.tx.try_send(request) {
            match e {
                mpsc::error::TrySendError::Full(_) => debug!("Reload already queued, skipping"),
                mpsc::error::TrySendError::Closed(_) => error!("Reload worker stopped, ignoring signal"),
            }
        }
    }
}

/// Single consumer applying reloads one at a time
pub struct ReloadWorker {
    store: Arc<CredentialStore>,
    source: ConfigSource,
    metrics: Arc<ExporterMetrics>,
}

impl ReloadWorker {
    pub fn new(store: Arc<CredentialStore>, source: ConfigSource, metrics: Arc<ExporterMetrics>) -> Self {
        Self {
            store,
            source,
            metrics,
        }
    }

    /// Start the worker task. It stops once every handle has been dropped.
    pub fn spawn(self, queue: usize) -> (ReloadHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let task = tokio::spawn(self.run(rx));
        (ReloadHandle { tx }, task)
    }

    async fn run(self, mut rx: mpsc::Receiver<ReloadRequest>) {
        while let Some(request) = rx.recv().await {
            let result = self.reload_blocking().await;
            self.metrics.record_reload(result.is_ok());

            match &result {
                Ok(()) => info!("Reloaded configuration ({:?} trigger)", request.trigger),
                Err(e) => error!("Error reloading config: {}", e),
            }

            if let Some(reply) = request.reply {
                // the requester may have gone away
                let _ = reply.send(result);
            }
        }
        debug!("Reload worker exiting");
    }

    /// Read and parse the source off the async workers
    async fn reload_blocking(&self) -> Result<()> {
        let store = self.store.clone();
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || store.reload(&source))
            .await
            .map_err(|e| ExporterError::Other(format!("reload task failed: {}", e)))?
    }
}

/// Forward SIGHUP to the reload worker
#[cfg(unix)]
pub fn spawn_signal_listener(handle: ReloadHandle) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration");
            handle.notify();
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(_handle: ReloadHandle) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(file: &mut NamedTempFile, body: &str) {
        let f = file.as_file_mut();
        f.set_len(0).unwrap();
        std::io::Seek::rewind(f).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    fn worker(file: &NamedTempFile) -> (Arc<CredentialStore>, Arc<ExporterMetrics>, ReloadHandle) {
        let store = Arc::new(CredentialStore::new());
        let metrics = Arc::new(ExporterMetrics::new("bigip").unwrap());
        let (handle, _task) = ReloadWorker::new(
            store.clone(),
            ConfigSource::File(file.path().to_path_buf()),
            metrics.clone(),
        )
        .spawn(4);
        (store, metrics, handle)
    }

    #[tokio::test]
    async fn test_request_reload_reports_outcome() {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        write(&mut file, "targets:\n  - pattern: lb01\n    user: first\n");
        let (store, metrics, handle) = worker(&file);

        handle.reload().await.unwrap();
        assert_eq!(store.resolve("lb01").unwrap().user, "first");
        assert!(metrics.last_reload_successful());

        write(&mut file, "targets:\n  - pattern: \"[\"\n    user: broken\n");
        assert!(handle.reload().await.is_err());
        assert_eq!(store.resolve("lb01").unwrap().user, "first");
        assert!(!metrics.last_reload_successful());
    }

    #[tokio::test]
    async fn test_concurrent_requests_each_get_a_reply() {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        write(&mut file, "targets:\n  - user: fallback\n");
        let (store, _metrics, handle) = worker(&file);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move { handle.reload().await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.resolve("anything").unwrap().user, "fallback");
    }

    #[tokio::test]
    async fn test_notify_applies_in_background() {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        write(&mut file, "targets:\n  - pattern: lb01\n    user: signalled\n");
        let (store, _metrics, handle) = worker(&file);

        handle.notify();
        // a request queued after the signal completes after it
        handle.reload().await.unwrap();
        assert_eq!(store.resolve("lb01").unwrap().user, "signalled");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_reload_on_single_threaded_runtime() {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        write(&mut file, "targets:\n  - pattern: lb01\n    user: admin\n");
        let (store, _metrics, handle) = worker(&file);

        let ticker = tokio::spawn(async { tokio::task::yield_now().await });
        handle.reload().await.unwrap();
        ticker.await.unwrap();
        assert_eq!(store.resolve("lb01").unwrap().user, "admin");
    }
}
