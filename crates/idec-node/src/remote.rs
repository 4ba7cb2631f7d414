//! [`RemoteNode`](idec_sync::RemoteNode) over an in-process axum router.
//!
//! Requests go through the full HTTP stack (routing, extractors, form
//! decoding) without a socket, so two nodes in one process sync exactly as
//! they would over the network.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use idec_sync::{Gateway, GatewayRemote, Result, SyncError};

/// Largest response body accepted from the router.
const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// [`Gateway`] that dispatches requests to an axum [`Router`].
#[derive(Clone)]
pub struct RouterGateway {
    router: Router,
}

impl RouterGateway {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, String)> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| SyncError::InvalidResponse(e.to_string()))?;
        Ok((status, body))
    }
}

fn build(request: axum::http::request::Builder, body: Body) -> Result<Request<Body>> {
    request
        .body(body)
        .map_err(|e| SyncError::Transport(e.to_string()))
}

#[async_trait]
impl Gateway for RouterGateway {
    async fn get(&self, path: &str) -> Result<Option<String>> {
        let request = build(Request::builder().method(Method::GET).uri(path), Body::empty())?;
        match self.send(request).await? {
            (StatusCode::NOT_FOUND, _) => Ok(None),
            (status, body) if status.is_success() => Ok(Some(body)),
            (status, body) => Err(SyncError::Transport(format!(
                "GET {} answered {}: {}",
                path,
                status,
                body.trim()
            ))),
        }
    }

    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<String> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = build(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(form),
        )?;
        match self.send(request).await? {
            (status, body) if status.is_success() => Ok(body),
            (status, body) => Err(SyncError::Transport(format!(
                "POST {} answered {}: {}",
                path,
                status,
                body.trim()
            ))),
        }
    }
}

/// A remote node reached through its router.
pub type RouterRemote = GatewayRemote<RouterGateway>;

/// Wrap a node's router as a [`RouterRemote`].
pub fn router_remote(router: Router) -> RouterRemote {
    GatewayRemote::new(RouterGateway::new(router))
}
