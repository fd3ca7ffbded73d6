//! HTTP front end.
//!
//! `GET /fill/{width}/{height}/{*source}` returns a JPEG thumbnail of
//! `source`; `GET /` is a health probe.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::fetch::{FetchError, Fetcher, Forwarded};
use crate::paths;
use crate::pipeline::{FillRequest, PipelineError, Previewer, ValidationError};
use crate::storage::FileStore;
use crate::transform::Transformer;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// JSON body of the health probe and of every error.
#[derive(Debug, Serialize)]
pub struct ResponseBody {
    /// `OK` or `Error`
    pub status: &'static str,
    /// Human readable failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine readable failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ResponseBody {
    /// Success body
    pub const fn ok() -> Self {
        Self {
            status: "OK",
            error: None,
            code: None,
        }
    }

    /// Failure body
    pub fn error(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status: "Error",
            error: Some(message.into()),
            code: Some(code),
        }
    }
}

/// A failed request, mapped to exactly one status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad path parameters
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A pipeline stage failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    /// HTTP status for this failure.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code for the JSON body.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_request",
            Self::Pipeline(PipelineError::Fetch(FetchError::Timeout(_))) => "fetch_timeout",
            Self::Pipeline(PipelineError::Fetch(_)) => "fetch_failed",
            Self::Pipeline(PipelineError::Transform(_)) => "transform_failed",
            Self::Pipeline(PipelineError::Persist { .. }) => "persist_failed",
            Self::Pipeline(PipelineError::ReadCached { .. }) => "cache_read_failed",
            Self::Pipeline(PipelineError::Task(_)) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ResponseBody::error(self.to_string(), self.code());
        (status, Json(body)).into_response()
    }
}

/// Build the router around a shared pipeline.
pub fn router<F, T, S>(previewer: Arc<Previewer<F, T, S>>) -> Router
where
    F: Fetcher,
    T: Transformer,
    S: FileStore,
{
    Router::new()
        .route("/", get(health))
        .route("/fill/{width}/{height}/{*source}", get(fill::<F, T, S>))
        .with_state(previewer)
}

async fn health() -> Json<ResponseBody> {
    Json(ResponseBody::ok())
}

async fn fill<F, T, S>(
    State(previewer): State<Arc<Previewer<F, T, S>>>,
    Path((width, height, source)): Path<(String, String, String)>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    F: Fetcher,
    T: Transformer,
    S: FileStore,
{
    let request = FillRequest::parse(&width, &height, &source).inspect_err(|e| {
        tracing::debug!("Rejected /fill/{width}/{height}/{source}: {e}");
    })?;

    let forwarded = Forwarded { headers, query };

    let preview = previewer
        .fill(&request, &forwarded)
        .await
        .inspect_err(|e| tracing::error!("{e}"))?;

    let cache_status = if preview.cache_hit { "HIT" } else { "MISS" };
    let response = (
        [(header::CONTENT_TYPE, "image/jpeg"), (X_CACHE, cache_status)],
        preview.bytes,
    );
    Ok(response.into_response())
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after the signal.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn run(config: &Config) -> Result<()> {
    paths::ensure_dir(&config.cache.dir)?;

    let previewer = Arc::new(Previewer::from_config(config));
    let addr = config.http_server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("HTTP server start error on '{addr}'"))?;

    tracing::info!(
        "{} listening on '{addr}' (cache: {}, capacity {})",
        config.app.name,
        config.cache.dir.display(),
        config.cache.capacity
    );

    serve(listener, router(previewer), shutdown_signal()).await?;

    tracing::info!("HTTP server stopped on '{addr}'");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM/SIGHUP on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(mut term), Ok(mut hup)) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = hup.recv() => {}
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ProxyClient;
    use crate::storage::DiskStore;
    use crate::transform::{FillTransformer, image_dimensions, test_jpeg};
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    /// What the fake source saw.
    #[derive(Default)]
    struct Upstream {
        hits: AtomicUsize,
        last_header: Mutex<Option<String>>,
        last_query: Mutex<Option<String>>,
    }

    async fn spawn(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, router, std::future::pending()));
        addr
    }

    async fn spawn_upstream() -> (SocketAddr, Arc<Upstream>) {
        let state = Arc::new(Upstream::default());
        let jpeg = test_jpeg(640, 480);

        let router = Router::new()
            .route(
                "/photo.jpg",
                get(
                    |State(up): State<Arc<Upstream>>,
                     axum::extract::RawQuery(query): axum::extract::RawQuery,
                     headers: HeaderMap| async move {
                        up.hits.fetch_add(1, Ordering::SeqCst);
                        *up.last_header.lock().unwrap() = headers
                            .get("x-trace-id")
                            .and_then(|v| v.to_str().ok())
                            .map(String::from);
                        *up.last_query.lock().unwrap() = query;
                        ([(header::CONTENT_TYPE, "image/jpeg")], jpeg)
                    },
                ),
            )
            .route(
                "/missing.jpg",
                get(|State(up): State<Arc<Upstream>>| async move {
                    up.hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }),
            )
            .with_state(Arc::clone(&state));

        (spawn(router).await, state)
    }

    async fn spawn_previewer(dir: &TempDir) -> SocketAddr {
        spawn_previewer_at(dir.path().to_path_buf()).await
    }

    async fn spawn_previewer_at(cache_dir: PathBuf) -> SocketAddr {
        let mut config = Config::default();
        config.cache.dir = cache_dir;
        config.cache.capacity = 5;

        let previewer = Previewer::new(
            &config,
            ProxyClient::new(Duration::from_secs(5)),
            FillTransformer,
            DiskStore,
        );
        spawn(router(Arc::new(previewer))).await
    }

    fn files_in(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempdir().unwrap();
        let app = spawn_previewer(&dir).await;

        let response = reqwest::get(format!("http://{app}/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), r#"{"status":"OK"}"#);
    }

    #[tokio::test]
    async fn test_repeat_request_served_from_cache() {
        let dir = tempdir().unwrap();
        let (source, upstream) = spawn_upstream().await;
        let app = spawn_previewer(&dir).await;
        let url = format!("http://{app}/fill/300/200/{source}/photo.jpg");

        let first = reqwest::get(&url).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(first.headers()["x-cache"], "MISS");
        let first = first.bytes().await.unwrap();
        assert_eq!(image_dimensions(&first).unwrap(), (300, 200));

        let second = reqwest::get(&url).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(second.bytes().await.unwrap(), first);

        assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
        assert_eq!(files_in(&dir), 1);
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_bad_request() {
        let dir = tempdir().unwrap();
        let (source, upstream) = spawn_upstream().await;
        let app = spawn_previewer(&dir).await;

        let response = reqwest::get(format!("http://{app}/fill/300/200/{source}/photo.png"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(body["status"], "Error");
        assert_eq!(body["code"], "bad_request");
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_dimensions_are_bad_request() {
        let dir = tempdir().unwrap();
        let app = spawn_previewer(&dir).await;

        for path in ["fill/abc/200/x/a.jpg", "fill/300/0/x/a.jpg"] {
            let response = reqwest::get(format!("http://{app}/{path}")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_is_server_error() {
        let dir = tempdir().unwrap();
        let (source, upstream) = spawn_upstream().await;
        let app = spawn_previewer(&dir).await;

        let response = reqwest::get(format!("http://{app}/fill/300/200/{source}/missing.jpg"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value =
            serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(body["code"], "fetch_failed");
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
        assert_eq!(files_in(&dir), 0);
    }

    #[tokio::test]
    async fn test_headers_and_query_are_forwarded() {
        let dir = tempdir().unwrap();
        let (source, upstream) = spawn_upstream().await;
        let app = spawn_previewer(&dir).await;

        let response = reqwest::Client::new()
            .get(format!("http://{app}/fill/100/100/{source}/photo.jpg?token=abc"))
            .header("x-trace-id", "trace-42")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            upstream.last_header.lock().unwrap().as_deref(),
            Some("trace-42")
        );
        assert_eq!(
            upstream.last_query.lock().unwrap().as_deref(),
            Some("token=abc")
        );
    }

    #[tokio::test]
    async fn test_unwritable_cache_dir_is_server_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let (source, upstream) = spawn_upstream().await;
        let app = spawn_previewer_at(blocker.join("cache")).await;
        let url = format!("http://{app}/fill/300/200/{source}/photo.jpg");

        let response = reqwest::get(&url).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value =
            serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(body["status"], "Error");
        assert_eq!(body["code"], "persist_failed");

        // Not registered: the retry fetches again and fails the same way
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 2);
        assert!(blocker.is_file());
    }

    #[test]
    fn test_error_codes() {
        let err = ApiError::from(ValidationError::Extension);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "bad_request");

        let err = ApiError::from(PipelineError::Fetch(FetchError::Timeout(Duration::from_secs(5))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "fetch_timeout");

        let err = ApiError::from(PipelineError::Persist {
            path: PathBuf::from("/nowhere/thumb.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "persist_failed");
    }
}
