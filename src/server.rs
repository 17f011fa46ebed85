//! JSON HTTP server.
//!
//! Exposes the core operations over a small JSON API. Transport framing is
//! deliberately thin: every handler delegates to the function-level
//! operations in [`crate::ingest`], [`crate::query`], and [`crate::store`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/organizations` | Register an organization (ingestion) |
//! | `POST` | `/organizations/{id}/ask` | Ask a question |
//! | `GET`  | `/organizations` | List registered organizations |
//! | `GET`  | `/organizations/{id}/interactions` | Recent history, newest first |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_query", "message": "question must not be empty" } }
//! ```
//!
//! Codes: `invalid_input`, `unsupported_document`, `invalid_query` (400),
//! `organization_not_found` (404), `already_indexed` (409),
//! `embedding_failure`, `generation_failure` (502), `index_unavailable`
//! (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::CoreError;
use crate::ingest::{self, CreateOrganization};
use crate::models::{IngestSource, InteractionRecord, ManualPayload, Organization};
use crate::query;
use crate::registry::IndexRegistry;
use crate::{db, migrate, store};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    registry: Arc<IndexRegistry>,
}

/// Starts the HTTP server.
///
/// Connects the database, runs migrations, constructs the (empty) index
/// registry for this process, and serves until terminated. Indexes are
/// rebuilt only through ingestion: organizations persisted by an earlier
/// process respond with `index_unavailable` until re-ingested.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        registry: Arc::new(IndexRegistry::new()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/organizations", post(handle_create).get(handle_list))
        .route("/organizations/{id}/ask", post(handle_ask))
        .route("/organizations/{id}/interactions", get(handle_history))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %bind_addr, "knowbot server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let (status, code) = match &err {
            CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            CoreError::UnsupportedDocument(_) => (StatusCode::BAD_REQUEST, "unsupported_document"),
            CoreError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            CoreError::OrganizationNotFound(_) => {
                (StatusCode::NOT_FOUND, "organization_not_found")
            }
            CoreError::AlreadyIndexed(_) => (StatusCode::CONFLICT, "already_indexed"),
            CoreError::EmbeddingFailure(_) => (StatusCode::BAD_GATEWAY, "embedding_failure"),
            CoreError::GenerationFailure(_) => (StatusCode::BAD_GATEWAY, "generation_failure"),
            CoreError::IndexUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "index_unavailable"),
            CoreError::Store(_) | CoreError::Payload(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /organizations ============

/// Create-organization request body. The `mode` tag selects the payload
/// shape; automatic mode carries the document as base64.
#[derive(Deserialize)]
struct CreateOrgRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    source: CreateOrgSource,
}

#[derive(Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum CreateOrgSource {
    Automatic { filename: String, document: String },
    Manual(ManualPayload),
}

#[derive(Serialize)]
struct OrganizationResponse {
    org_id: String,
    name: String,
    description: String,
    location: String,
    mode: String,
    created_at: String,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            org_id: org.org_id,
            name: org.name,
            description: org.description,
            location: org.location,
            mode: org.payload.mode().to_string(),
            created_at: org.created_at.to_rfc3339(),
        }
    }
}

async fn handle_create(
    State(state): State<AppState>,
    Json(request): Json<CreateOrgRequest>,
) -> Result<(StatusCode, Json<OrganizationResponse>), AppError> {
    let source = match request.source {
        CreateOrgSource::Automatic { filename, document } => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(document.as_bytes())
                .map_err(|e| bad_request(format!("document is not valid base64: {}", e)))?;
            IngestSource::Automatic { filename, bytes }
        }
        CreateOrgSource::Manual(payload) => IngestSource::Manual(payload),
    };

    let org = ingest::create_organization(
        &state.config,
        &state.pool,
        &state.registry,
        CreateOrganization {
            name: request.name,
            description: request.description,
            source,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(org.into())))
}

// ============ GET /organizations ============

#[derive(Serialize)]
struct OrganizationListResponse {
    organizations: Vec<OrganizationResponse>,
}

async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<OrganizationListResponse>, AppError> {
    let organizations = store::list_organizations(&state.pool)
        .await?
        .into_iter()
        .map(OrganizationResponse::from)
        .collect();
    Ok(Json(OrganizationListResponse { organizations }))
}

// ============ POST /organizations/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    org_id: String,
    answer: String,
    created_at: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let answer = query::answer(
        &state.config,
        &state.pool,
        &state.registry,
        &id,
        &request.question,
    )
    .await?;

    Ok(Json(AskResponse {
        org_id: id,
        answer: answer.answer,
        created_at: answer.created_at.to_rfc3339(),
    }))
}

// ============ GET /organizations/{id}/interactions ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct InteractionResponse {
    question: String,
    answer: String,
    created_at: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    org_id: String,
    interactions: Vec<InteractionResponse>,
}

async fn handle_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    if store::find_organization(&state.pool, &id).await?.is_none() {
        return Err(CoreError::OrganizationNotFound(id).into());
    }

    let limit = params
        .limit
        .unwrap_or(store::RECENT_HISTORY_LIMIT)
        .clamp(1, store::RECENT_HISTORY_LIMIT);

    let interactions = store::list_recent_interactions(&state.pool, &id, limit)
        .await?
        .into_iter()
        .map(|record: InteractionRecord| InteractionResponse {
            question: record.question,
            answer: record.answer,
            created_at: record.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(HistoryResponse {
        org_id: id,
        interactions,
    }))
}
