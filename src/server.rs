//! HTTP boundary around [`InferencePipeline`].
//!
//! Routes:
//! - `POST /api/analyze` - multipart upload with an image in field `file`
//! - `GET /api/analyze` - whether the model is loaded yet
//! - `GET /health` - whether the model artifact is present

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, signal, task, time};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::pipeline::InferencePipeline;

const UPLOAD_FIELD: &str = "file";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: InferencePipeline,
    pub request_timeout: Duration,
}

/// Build the router.
#[must_use]
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/analyze", get(analyze_status).post(analyze))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(Arc::new(state))
}

/// Bind and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(pipeline: InferencePipeline, config: &ServerConfig) -> Result<()> {
    let state = AppState {
        pipeline,
        request_timeout: config.request_timeout(),
    };
    let app = build_app(state, config.max_upload_bytes);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn analyze(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => {
                let content_type = field.content_type().map(str::to_owned);
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((content_type, bytes));
                        break;
                    }
                    Err(err) => return error_response(err.status(), &err.body_text()),
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => return error_response(err.status(), &err.body_text()),
        }
    }

    let Some((content_type, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided");
    };

    if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
        return error_response(StatusCode::BAD_REQUEST, "File must be an image");
    }

    let pipeline = state.pipeline.clone();
    let job = task::spawn_blocking(move || pipeline.analyze(&bytes));

    // On timeout the blocking task is abandoned, not cancelled; it runs to
    // completion in the background.
    match time::timeout(state.request_timeout, job).await {
        Ok(Ok(Ok(result))) => Json(result).into_response(),
        Ok(Ok(Err(err))) => pipeline_error(&err),
        Ok(Err(join_err)) => {
            error!("analysis task failed: {join_err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        Err(_) => {
            warn!("analysis exceeded {:?}", state.request_timeout);
            error_response(StatusCode::GATEWAY_TIMEOUT, "Analysis timed out")
        }
    }
}

async fn analyze_status(State(state): State<Arc<AppState>>) -> Response {
    let model = if state.pipeline.executor().is_loaded() {
        "loaded"
    } else {
        "not loaded"
    };
    Json(json!({
        "message": "Fake Image Detector API - Use POST /api/analyze to analyze images",
        "model": model,
    }))
    .into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    // Probing candidate paths touches the filesystem.
    let pipeline = state.pipeline.clone();
    let available = match task::spawn_blocking(move || pipeline.executor().is_available()).await {
        Ok(available) => available,
        Err(join_err) => {
            error!("health probe failed: {join_err}");
            false
        }
    };
    let status = if available { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "model": available,
        "runtime": state.pipeline.executor().backend_name(),
        "device": "cpu",
    }))
    .into_response()
}

/// HTTP status for a pipeline failure.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::EmptyInput | ErrorKind::Decode => StatusCode::BAD_REQUEST,
        ErrorKind::ModelNotFound => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Inference | ErrorKind::Configuration | ErrorKind::Io => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn pipeline_error(err: &Error) -> Response {
    let kind = err.kind();
    let status = status_for(kind);

    if kind.is_client_error() {
        warn!("rejected upload: {err}");
    } else {
        error!("analysis failed: {err}");
    }

    let message = match kind {
        ErrorKind::EmptyInput => "Empty file".to_string(),
        ErrorKind::Decode => format!("Image processing error: {err}"),
        _ => err.to_string(),
    };
    error_response(status, &message)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
