//! HTTP handlers for certificate issuance

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use certship_core::{IssueError, RawIssueRequest};
use certship_issuer::{sorted_provider_ids, IssueService};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

/// Application state shared by the handlers
pub struct AppState {
    pub service: IssueService,
}

/// OpenAPI documentation for the issuance endpoints
#[derive(OpenApi)]
#[openapi(
    paths(issue_certificate, health),
    components(schemas(RawIssueRequest, IssueResponse, PublishedPaths)),
    tags(
        (name = "Certificates", description = "Certificate issuance operations")
    )
)]
pub struct CertsApiDoc;

/// Configure issuance routes
pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/certs", post(issue_certificate))
        .route("/health", get(health))
}

/// Successful issuance envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueResponse {
    pub success: bool,
    pub result: PublishedPaths,
}

/// Where the issued bundle was published
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishedPaths {
    /// Stable prefix, overwritten with the newest bundle
    #[schema(example = "s3://example-certs/certificates/example.com/live")]
    pub live_s3_path: String,
    /// Never-overwritten timestamped snapshot prefix
    #[schema(example = "s3://example-certs/certificates/example.com/2024-01-01_00-00-00_UTC")]
    pub timed_s3_path: String,
}

/// Issue a certificate and publish the bundle
///
/// Runs the whole job synchronously: validates the request, verifies the
/// bucket is writable, drives certbot for the requested DNS provider, and
/// uploads the issued files. The call blocks until the job finishes.
#[utoipa::path(
    tag = "Certificates",
    post,
    path = "/certs",
    request_body = RawIssueRequest,
    responses(
        (status = 200, description = "Certificate issued and published", body = IssueResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Issuance or publishing failed")
    )
)]
pub async fn issue_certificate(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match run_job(&state, &body).await {
        Ok(result) => Json(IssueResponse {
            success: true,
            result,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn run_job(state: &AppState, body: &[u8]) -> Result<PublishedPaths, IssueError> {
    // lenient body handling: a broken payload or a wrongly typed field
    // becomes a field-keyed validation message instead of a framework-level
    // rejection
    let parsed: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| RawIssueRequest::invalid_body())?;
    let req = RawIssueRequest::parse(&parsed, &sorted_provider_ids())?;
    info!(
        provider = %req.provider,
        domains = ?req.domains,
        bucket = %req.target_bucket,
        "Certificate requested"
    );
    // dry-run write check, stays behind as the job's log marker
    state.service.preflight_marker(&req).await?;
    let published = state.service.issue(&req).await?;
    Ok(PublishedPaths {
        live_s3_path: published.live_s3_path,
        timed_s3_path: published.timed_s3_path,
    })
}

/// Maps the error taxonomy onto status codes and the wire envelope. Kinds
/// outside the taxonomy leak their message only.
fn error_response(err: &IssueError) -> Response {
    let status = match err {
        IssueError::Validation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(kind = err.error_type(), error = %err, "Issuance failed");
    }

    let mut payload = json!({
        "type": err.error_type(),
        "message": err.to_string(),
    });
    match err {
        IssueError::Validation { errors } => {
            payload["errors"] = json!(errors);
        }
        IssueError::S3 { bucket } => {
            payload["bucket"] = json!(bucket);
        }
        IssueError::S3Upload {
            source_path,
            bucket,
            bucket_path,
        } => {
            payload["source_path"] = json!(source_path);
            payload["bucket"] = json!(bucket);
            payload["bucket_path"] = json!(bucket_path);
        }
        IssueError::Certbot {
            command,
            timeout_secs,
            output,
        }
        | IssueError::CertbotTimeout {
            command,
            timeout_secs,
            output,
        } => {
            payload["command"] = json!(command);
            payload["timeout"] = json!(timeout_secs);
            payload["output"] = json!(output.lines().collect::<Vec<_>>());
        }
        IssueError::SecretFetch(_) | IssueError::UnknownProvider(_) | IssueError::Internal(_) => {}
    }

    (status, Json(json!({ "success": false, "error": payload }))).into_response()
}

/// Liveness probe
#[utoipa::path(
    tag = "Certificates",
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
