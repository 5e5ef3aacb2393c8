// SPDX-FileCopyrightText: 2026 Kure Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kure serve`: snapshot download over HTTP.
//!
//! `GET /backup` streams a consistent image of the database as an
//! attachment; `GET /health` reports liveness for supervisors.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use kure_config::HttpConfig;
use kure_core::KureError;
use kure_storage::SnapshotExporter;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Shared state for axum request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub exporter: SnapshotExporter,
    /// File name advertised in `Content-Disposition`.
    pub db_name: String,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/backup", get(get_backup))
        .route("/health", get(get_health))
        .with_state(state)
}

/// GET /backup
///
/// The image is built in memory first so `Content-Length` is exact.
pub async fn get_backup(State(state): State<AppState>) -> Response {
    let exporter = state.exporter.clone();
    let image = match tokio::task::spawn_blocking(move || exporter.to_bytes()).await {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => return error_response(&e),
        Err(e) => return error_response(&KureError::Internal(format!("snapshot task failed: {e}"))),
    };

    info!(bytes = image.len(), "serving snapshot");
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", state.db_name),
            ),
            (header::CONTENT_LENGTH, image.len().to_string()),
        ],
        image,
    )
        .into_response()
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

fn error_response(err: &KureError) -> Response {
    error!(error = %err, "snapshot export failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.user_message(),
        }),
    )
        .into_response()
}

/// Serve until `shutdown` is cancelled.
pub async fn run(
    config: &HttpConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), KureError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KureError::Config(format!("failed to bind {addr}: {e}")))?;

    info!("snapshot server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(KureError::storage)?;

    info!("snapshot server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn state_with_db(dir: &tempfile::TempDir) -> AppState {
        let path = dir.path().join("kure.db");
        let db = kure_storage::Database::open(&path).await.unwrap();
        let session = std::sync::Arc::new(
            kure_crypt::Session::unlocked(kure_crypt::KdfParams::insecure_fast(), b"pw").unwrap(),
        );
        kure_storage::register(&db, &session).await.unwrap();
        db.close().await.unwrap();
        AppState {
            exporter: SnapshotExporter::new(path),
            db_name: "kure.db".to_string(),
            start_time: Instant::now(),
        }
    }

    #[tokio::test]
    async fn backup_sets_download_headers() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state_with_db(&dir).await);

        let response = app
            .oneshot(Request::get("/backup").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"kure.db\""
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            headers[header::CONTENT_LENGTH].to_str().unwrap(),
            body.len().to_string()
        );
        assert!(body.starts_with(b"SQLite format 3\0"));
    }

    #[tokio::test]
    async fn backup_of_missing_database_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(AppState {
            exporter: SnapshotExporter::new(dir.path().join("absent.db")),
            db_name: "kure.db".to_string(),
            start_time: Instant::now(),
        });

        let response = app
            .oneshot(Request::get("/backup").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state_with_db(&dir).await);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
