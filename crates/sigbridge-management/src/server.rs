//! HTTP endpoint exposing version, status and log files.
//!
//! | Route                  | Response                                         |
//! |------------------------|--------------------------------------------------|
//! | `GET /api/version`     | [`VersionInfo`] as JSON, 404 before first start   |
//! | `GET /api/status`      | [`ExecutiveStatus`] as JSON, 404 when not started |
//! | `GET /api/logs`        | list of [`LogFileInfo`] as JSON                   |
//! | `GET /api/logs/{name}` | raw file contents, 404 when the name is unknown   |
//!
//! [`VersionInfo`]: sigbridge_core::VersionInfo
//! [`ExecutiveStatus`]: sigbridge_core::ExecutiveStatus
//! [`LogFileInfo`]: crate::LogFileInfo

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use sigbridge_core::StatusSource;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{ManagementError, ManagementResult};
use crate::logs::LogDirectory;

/// Shared state for the HTTP handlers.
struct ServerState {
    status: Arc<dyn StatusSource>,
    logs: LogDirectory,
}

/// Builds the management router.
pub fn router(status: Arc<dyn StatusSource>, logs: LogDirectory) -> Router {
    let state = Arc::new(ServerState { status, logs });
    Router::new()
        .route("/api/version", get(version))
        .route("/api/status", get(status_handler))
        .route("/api/logs", get(list_logs))
        .route("/api/logs/{name}", get(read_log))
        .with_state(state)
}

/// Binds `addr` and serves the management API until the handle is shut down.
pub async fn serve(
    addr: &str,
    status: Arc<dyn StatusSource>,
    logs: LogDirectory,
) -> ManagementResult<ManagementHandle> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ManagementError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ManagementError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!(addr = %local_addr, logs = %logs.root().display(), "Management endpoint listening");

    let token = CancellationToken::new();
    let shutdown = token.clone();
    let app = router(status, logs);

    let task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown.cancelled_owned());
        if let Err(e) = server.await {
            error!(error = %e, "Management endpoint error");
        }
        debug!("Management endpoint stopped");
    });

    Ok(ManagementHandle {
        local_addr,
        token,
        task: Some(task),
    })
}

/// Handle to a running management endpoint.
pub struct ManagementHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ManagementHandle {
    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for the server task to finish.
    pub async fn shutdown(mut self) {
        info!(addr = %self.local_addr, "Management endpoint shutting down");
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(error = %e, "Management endpoint task panicked");
        }
    }
}

impl Drop for ManagementHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn not_found(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

fn internal(err: &ManagementError) -> Response {
    error!(error = %err, "Management request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

async fn version(State(state): State<Arc<ServerState>>) -> Response {
    match state.status.version_info() {
        Some(info) => Json(info).into_response(),
        None => not_found("executive has not started"),
    }
}

async fn status_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.status.executive_status() {
        Some(status) => Json(status).into_response(),
        None => not_found("executive is not running"),
    }
}

async fn list_logs(State(state): State<Arc<ServerState>>) -> Response {
    match state.logs.list().await {
        Ok(files) => Json(files).into_response(),
        Err(e) => internal(&e),
    }
}

async fn read_log(State(state): State<Arc<ServerState>>, Path(name): Path<String>) -> Response {
    match state.logs.open(&name).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(e) if e.is_not_found() => not_found(e.to_string()),
        Err(e) => internal(&e),
    }
}
