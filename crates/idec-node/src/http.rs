//! HTTP surface of a node.
//!
//! Every answer is `text/plain`. Paths follow the legacy layout:
//!
//! | Route                           | Answer                                  |
//! |---------------------------------|-----------------------------------------|
//! | `GET /e/{echoarea}`             | index of one echoarea                   |
//! | `GET /m/{msgid}`                | one record, 404 with empty body if none |
//! | `GET /u/e/{e1}/.../[{s}:{c}]`   | index of several echoareas              |
//! | `GET /u/m/{id1}/...`            | `msgid:base64` bundle                   |
//! | `GET /x/c/{e1}/...`             | `name:count` lines                      |
//! | `POST /u/point`                 | toss a point message (`pauth`, `tmsg`)  |
//! | `GET /u/point/{pauth}/{tmsg}`   | same, for clients that cannot POST      |
//! | `GET /list.txt`                 | `name:count:description` lines          |
//! | `GET /blacklist.txt`            | blacklisted msgids                      |

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use idec_store::Store;
use idec_sync::{Responder, SyncError};

/// Shared state of the HTTP handlers.
pub type AppState = Responder<dyn Store>;

const GREETING: &str = "IDEC node\n";

/// Build the node router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/e/{echoarea}", get(echoarea_index))
        .route("/m/{msgid}", get(message))
        .route("/u/e/{*echoareas}", get(universal_index))
        .route("/u/m/{*msgids}", get(universal_bundle))
        .route("/x/c/{*echoareas}", get(counts))
        .route("/u/point", axum::routing::post(point_form))
        .route("/u/point/{pauth}/{*tmsg}", get(point_path))
        .route("/list.txt", get(list_txt))
        .route("/blacklist.txt", get(blacklist_txt))
        .with_state(state)
}

/// Handler failure; the store or codec broke, not the request.
pub struct ApiError(SyncError);

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}\n", self.0)).into_response()
    }
}

type ApiResult = std::result::Result<String, ApiError>;

async fn index() -> &'static str {
    GREETING
}

async fn echoarea_index(State(state): State<AppState>, Path(echoarea): Path<String>) -> ApiResult {
    Ok(state.echoarea_index(&echoarea).await?)
}

async fn message(
    State(state): State<AppState>,
    Path(msgid): Path<String>,
) -> std::result::Result<Response, ApiError> {
    Ok(match state.message(&msgid).await? {
        Some(record) => record.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

async fn universal_index(State(state): State<AppState>, Path(tail): Path<String>) -> ApiResult {
    Ok(state.universal_index(&tail).await?)
}

async fn universal_bundle(State(state): State<AppState>, Path(tail): Path<String>) -> ApiResult {
    Ok(state.universal_bundle(&tail).await?)
}

async fn counts(State(state): State<AppState>, Path(tail): Path<String>) -> ApiResult {
    Ok(state.counts(&tail).await?)
}

#[derive(Debug, Deserialize)]
struct PointForm {
    pauth: String,
    tmsg: String,
}

async fn point_form(State(state): State<AppState>, Form(form): Form<PointForm>) -> ApiResult {
    Ok(state.point_message(&form.pauth, &form.tmsg).await?)
}

async fn point_path(
    State(state): State<AppState>,
    Path((pauth, tmsg)): Path<(String, String)>,
) -> ApiResult {
    Ok(state.point_message(&pauth, &tmsg).await?)
}

async fn list_txt(State(state): State<AppState>) -> ApiResult {
    Ok(state.list_txt().await?)
}

async fn blacklist_txt(State(state): State<AppState>) -> ApiResult {
    Ok(state.blacklist_txt().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use idec_core::Submission;
    use idec_store::SqliteStore;
    use tower::ServiceExt;

    fn app() -> (Arc<dyn Store>, Router) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open_memory().unwrap());
        let router = router(Responder::new(store.clone()));
        (store, router)
    }

    async fn call(router: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_greeting_and_empty_lists() {
        let (_store, router) = app();
        assert_eq!(call(&router, get("/")).await, (StatusCode::OK, GREETING.into()));
        assert_eq!(
            call(&router, get("/e/ii.test.14")).await,
            (StatusCode::OK, "\n\n".into())
        );
        assert_eq!(
            call(&router, get("/x/c/a/b")).await,
            (StatusCode::OK, "a:0\nb:0\n\n".into())
        );
    }

    #[tokio::test]
    async fn test_missing_message_is_404_with_empty_body() {
        let (_store, router) = app();
        assert_eq!(
            call(&router, get("/m/LUzYMFEcWgATmtEYJvAw")).await,
            (StatusCode::NOT_FOUND, String::new())
        );
        assert_eq!(
            call(&router, get("/m/short")).await,
            (StatusCode::NOT_FOUND, String::new())
        );
    }

    #[tokio::test]
    async fn test_point_post_and_get() {
        let (store, router) = app();
        let authstr = store.register_point("alice").await.unwrap().into_token();
        let tmsg = Submission::new("chat", "All", "hi", "hello").encode();

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("pauth", &authstr)
            .append_pair("tmsg", &tmsg)
            .finish();
        let post = Request::builder()
            .method("POST")
            .uri("/u/point")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let (status, text) = call(&router, post).await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.starts_with("msg ok:"));

        let msgid = text.trim_start_matches("msg ok:").trim();
        let (status, record) = call(&router, get(&format!("/m/{msgid}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(record.starts_with("ii/ok\nchat\n"));

        let (_, text) = call(&router, get(&format!("/u/point/wrong/{tmsg}"))).await;
        assert_eq!(text, "error: no auth");
    }
}
