use async_trait::async_trait;
use log::{debug, trace};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{DeviceApi, DeviceConnector, StatRecord, Stats};
use crate::config::AuthMode;
use crate::credentials::Credentials;
use crate::error::{ExporterError, Result};

const NODE_STATS_PATH: &str = "/mgmt/tm/ltm/node/stats";
const VIRTUAL_STATS_PATH: &str = "/mgmt/tm/ltm/virtual/stats";
const LOGIN_PATH: &str = "/mgmt/shared/authn/login";
const TOKEN_HEADER: &str = "X-F5-Auth-Token";

/// HTTP client settings shared by every device handle
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    /// Per-request timeout
    pub timeout: Duration,
    /// Accept self-signed appliance certificates
    pub accept_invalid_certs: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }
}

/// Connector for BIG-IP iControl REST, holding one connection pool for the process
#[derive(Clone)]
pub struct BigIpConnector {
    client: reqwest::Client,
}

impl BigIpConnector {
    pub fn new(settings: &DeviceSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

impl DeviceConnector for BigIpConnector {
    fn connect(&self, target: &str, credentials: &Credentials) -> Arc<dyn DeviceApi> {
        Arc::new(BigIpDevice::new(self.client.clone(), target, credentials.clone()))
    }
}

/// A handle to one appliance, scoped to a single scrape
pub struct BigIpDevice {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: OnceCell<String>,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default)]
    entries: BTreeMap<String, StatsEntry>,
}

#[derive(Deserialize)]
struct StatsEntry {
    #[serde(rename = "nestedStats", default)]
    nested_stats: NestedStats,
}

#[derive(Deserialize, Default)]
struct NestedStats {
    #[serde(default)]
    entries: StatRecord,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: LoginToken,
}

#[derive(Deserialize)]
struct LoginToken {
    token: String,
}

impl BigIpDevice {
    pub fn new(client: reqwest::Client, target: &str, credentials: Credentials) -> Self {
        let base_url = if target.starts_with("http://") || target.starts_with("https://") {
            target.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", target)
        };

        Self {
            client,
            base_url,
            credentials,
            token: OnceCell::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn login(&self) -> Result<String> {
        debug!("Requesting auth token from {}", self.base_url);
        let response = self
            .client
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .json(&json!({
                "username": self.credentials.user,
                "password": self.credentials.password,
                "loginProviderName": "tmos",
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ExporterError::Device(format!("login failed: {}", e)))?;

        let login: LoginResponse = response.json().await?;
        Ok(login.token.token)
    }

    async fn get_stats(&self, path: &str) -> Result<Stats> {
        let url = format!("{}{}", self.base_url, path);
        trace!("GET {}", url);

        let request = match self.credentials.auth_mode {
            AuthMode::Basic => self
                .client
                .get(&url)
                .basic_auth(&self.credentials.user, Some(&self.credentials.password)),
            AuthMode::Token => {
                let token = self.token.get_or_try_init(|| self.login()).await?;
                self.client.get(&url).header(TOKEN_HEADER, token.as_str())
            }
        };

        let response = request.send().await?.error_for_status()?;
        let body: StatsResponse = response.json().await?;

        Ok(body
            .entries
            .into_iter()
            .map(|(path, entry)| (path, entry.nested_stats.entries))
            .collect())
    }
}

#[async_trait]
impl DeviceApi for BigIpDevice {
    async fn fetch_node_stats(&self) -> Result<Stats> {
        self.get_stats(NODE_STATS_PATH).await
    }

    async fn fetch_virtual_server_stats(&self) -> Result<Stats> {
        self.get_stats(VIRTUAL_STATS_PATH).await
    }
}
