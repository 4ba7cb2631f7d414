//! [`Gateway`] to an upstream node over the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use url::Url;

use idec_sync::{Gateway, GatewayRemote, Result, SyncError};

use crate::error::NodeError;

/// Default per-request timeout towards an uplink.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Gateway`] speaking HTTP to a node at a base URL.
///
/// Paths are resolved below the base, so `http://host/ii/` serves
/// `/u/e/...` as `http://host/ii/u/e/...`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(base: &str, timeout: Duration) -> std::result::Result<Self, NodeError> {
        let mut base = parse_base(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Config(format!("http client: {}", e)))?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| SyncError::Transport(format!("bad path {}: {}", path, e)))
    }
}

/// Check that `url` is an absolute http(s) URL.
pub fn parse_base(url: &str) -> std::result::Result<Url, NodeError> {
    let parsed =
        Url::parse(url).map_err(|e| NodeError::Config(format!("invalid uplink url {}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NodeError::Config(format!(
            "uplink url must be http or https, got {}",
            other
        ))),
    }
}

fn transport(e: reqwest::Error) -> SyncError {
    SyncError::Transport(e.to_string())
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get(&self, path: &str) -> Result<Option<String>> {
        let url = self.url(path)?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await.map_err(transport)?)),
            status => Err(SyncError::Transport(format!("GET {} answered {}", path, status))),
        }
    }

    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<String> {
        let url = self.url(path)?;
        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Transport(format!("POST {} answered {}", path, status)));
        }
        response.text().await.map_err(transport)
    }
}

/// A remote node reached over HTTP.
pub type HttpRemote = GatewayRemote<HttpGateway>;

pub fn http_remote(base: &str, timeout: Duration) -> std::result::Result<HttpRemote, NodeError> {
    Ok(GatewayRemote::new(HttpGateway::new(base, timeout)?))
}
