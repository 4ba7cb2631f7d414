//! The Node: a store plus everything that serves and feeds it.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use idec_store::{Registration, Store};
use idec_sync::{RemoteNode, Responder, SyncClient, SyncReport, TossingService};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::http;
use crate::uplink::{http_remote, HttpRemote};

/// A running node's context.
///
/// Holds the configuration and the one store every component shares.
pub struct Node {
    config: NodeConfig,
    store: Arc<dyn Store>,
    responder: Responder<dyn Store>,
}

impl Node {
    /// Open the store named by the configuration.
    pub fn open(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let store = idec_store::open(config.store.backend, &config.store.path)?;
        tracing::info!(
            backend = %config.store.backend,
            path = %config.store.path.display(),
            "node store opened"
        );
        Ok(Self::with_store(config, store))
    }

    /// Build a node around an existing store.
    pub fn with_store(config: NodeConfig, store: Arc<dyn Store>) -> Self {
        let responder = Responder::new(store.clone()).with_echoareas(config.advertised());
        Self {
            config,
            store,
            responder,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn responder(&self) -> &Responder<dyn Store> {
        &self.responder
    }

    pub fn tosser(&self) -> TossingService<dyn Store> {
        TossingService::new(self.store.clone())
    }

    /// The HTTP surface of this node.
    pub fn router(&self) -> Router {
        http::router(self.responder.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Points
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register_point(&self, username: &str) -> Result<Registration> {
        let registration = self.store.register_point(username).await?;
        if matches!(registration, Registration::Created(_)) {
            tracing::info!(username, "point registered");
        }
        Ok(registration)
    }

    pub async fn list_points(&self) -> Result<Vec<String>> {
        Ok(self.store.list_points().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Uplink
    // ─────────────────────────────────────────────────────────────────────────

    /// A sync client pulling the configured uplink echoareas from `remote`.
    pub fn sync_client<R: RemoteNode + ?Sized>(
        &self,
        remote: Arc<R>,
    ) -> Result<SyncClient<dyn Store, R>> {
        let mut client =
            SyncClient::new(self.store.clone(), remote).with_config(self.config.sync_config());
        if let Some(uplink) = &self.config.uplink {
            client.add_echoareas(&uplink.echoareas)?;
            if let Some(auth) = &uplink.auth {
                client = client.with_auth(auth.clone());
            }
        }
        Ok(client)
    }

    /// The configured uplink, reached over HTTP.
    pub fn uplink_remote(&self) -> Result<HttpRemote> {
        let uplink = self
            .config
            .uplink
            .as_ref()
            .ok_or_else(|| NodeError::Config("no [uplink] configured".to_string()))?;
        let url = uplink
            .url
            .as_deref()
            .ok_or_else(|| NodeError::Config("uplink url is not set".to_string()))?;
        http_remote(url, uplink.timeout())
    }

    /// Run one sync pass against the configured uplink.
    pub async fn fetch(&self) -> Result<SyncReport> {
        let client = self.sync_client(Arc::new(self.uplink_remote()?))?;
        let report = client.sync_once().await?;
        tracing::info!(saved = report.saved, requested = report.requested, "fetch finished");
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serving
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.listen_addr()?).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_on<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "serving");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("server stopped");
        Ok(())
    }
}
