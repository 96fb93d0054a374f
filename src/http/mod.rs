//! HTTP surface of the graph engine.
//!
//! The upstream gateway terminates authentication and forwards the
//! authenticated user in the `X-User-Id` header; this layer additionally
//! checks a service bearer key (unless authless mode is enabled for local
//! development) and maps service errors onto the standard envelope.

use crate::config::Config;
use crate::db::Db;
use crate::error::{JournalGraphError, Result};
use crate::graph;
use crate::graph::chain::ChainDirection;
use crate::graph::service::RelationService;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// HTTP server wrapper
pub struct HttpServer {
    service: Arc<RelationService>,
    api_key: String,
    allowed_origins: Vec<String>,
    authless: bool,
    port: u16,
}

impl HttpServer {
    /// Create a new HTTP server around the relation service.
    pub fn new(db: Db, config: Config) -> Result<Self> {
        // API key is optional if authless mode is enabled
        let api_key = if config.http_server.authless {
            String::new()
        } else {
            std::env::var(&config.http_server.api_key_env).map_err(|_| {
                JournalGraphError::Config(format!(
                    "Environment variable {} not set. Set it in your .env file or as an \
                     environment variable, or enable authless mode.",
                    config.http_server.api_key_env
                ))
            })?
        };

        let service = Arc::new(RelationService::new(db, config.graph.clone()));

        Ok(Self {
            service,
            api_key,
            allowed_origins: config.http_server.allowed_origins.clone(),
            authless: config.http_server.authless,
            port: config.http_server.port,
        })
    }

    /// Run the HTTP server
    pub async fn run(&self) -> Result<()> {
        let app = self.create_router();

        let addr = format!("127.0.0.1:{}", self.port);
        log::info!("Starting journalgraph HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            JournalGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            JournalGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    fn create_router(&self) -> Router {
        // Restrict CORS to configured origins; allow Any when none are
        // configured (local dev / authless)
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/relations", post(handle_create_relation))
            .route("/api/relations/:id", delete(handle_delete_relation))
            .route("/api/relation-types", get(handle_relation_types))
            .route("/api/relations/most-connected", get(handle_most_connected))
            .route("/api/relations/graph", get(handle_graph))
            .route("/api/entries/:id/relations", get(handle_entry_relations))
            .route("/api/entries/:id/chain", get(handle_chain))
            .route("/health", get(handle_health))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
            .with_state(AppState {
                service: Arc::clone(&self.service),
                api_key: self.api_key.clone(),
                authless: self.authless,
            })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    service: Arc<RelationService>,
    api_key: String,
    authless: bool,
}

#[derive(Debug, Deserialize)]
struct CreateRelationRequest {
    from_entry_id: String,
    to_entry_id: String,
    relation_type: String,
    description: Option<String>,
}

async fn handle_create_relation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRelationRequest>,
) -> Response {
    let user_id = match authenticate(&state, &headers) {
        Ok(u) => u,
        Err(response) => return response,
    };

    match state
        .service
        .create_relation(
            &user_id,
            &request.from_entry_id,
            &request.to_entry_id,
            &request.relation_type,
            request.description,
        )
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_delete_relation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(relation_id): Path<String>,
) -> Response {
    let user_id = match authenticate(&state, &headers) {
        Ok(u) => u,
        Err(response) => return response,
    };

    match state.service.delete_relation(&user_id, &relation_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_relation_types() -> Response {
    (StatusCode::OK, Json(graph::relation_types())).into_response()
}

async fn handle_entry_relations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
) -> Response {
    let user_id = match authenticate(&state, &headers) {
        Ok(u) => u,
        Err(response) => return response,
    };

    match state.service.relations_for_entry(&user_id, &entry_id).await {
        Ok(relations) => (StatusCode::OK, Json(relations)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_chain(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let user_id = match authenticate(&state, &headers) {
        Ok(u) => u,
        Err(response) => return response,
    };

    let max_depth = match parse_usize_param(&params, "max_depth") {
        Ok(v) => v,
        Err(e) => return error_response(e),
    };
    let direction = match params
        .get("direction")
        .map(|s| ChainDirection::parse(s))
        .transpose()
    {
        Ok(d) => d.unwrap_or(ChainDirection::Forward),
        Err(e) => return error_response(e),
    };

    match state
        .service
        .chain(&user_id, &entry_id, max_depth, direction)
        .await
    {
        Ok(chain) => (StatusCode::OK, Json(chain)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_most_connected(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let user_id = match authenticate(&state, &headers) {
        Ok(u) => u,
        Err(response) => return response,
    };

    let limit = match parse_usize_param(&params, "limit") {
        Ok(v) => v,
        Err(e) => return error_response(e),
    };

    match state.service.most_connected(&user_id, limit).await {
        Ok(ranked) => (StatusCode::OK, Json(ranked)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_graph(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let user_id = match authenticate(&state, &headers) {
        Ok(u) => u,
        Err(response) => return response,
    };

    let focal = params.get("focal_entry_id").map(|s| s.as_str());
    match state.service.graph(&user_id, focal).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "journalgraph",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

/// Validate the bearer key (unless authless) and extract the gateway-supplied
/// user id.
fn authenticate(state: &AppState, headers: &HeaderMap) -> std::result::Result<String, Response> {
    if !state.authless {
        validate_auth(headers, &state.api_key)?;
    }

    headers
        .get("x-user-id")
        .and_then(|h| h.to_str().ok())
        .filter(|u| !u.is_empty())
        .map(|u| u.to_string())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Missing X-User-Id header",
                    "message": "Requests must come through the authenticating gateway"
                })),
            )
                .into_response()
        })
}

/// Validate Authorization header
fn validate_auth(headers: &HeaderMap, expected_key: &str) -> std::result::Result<(), Response> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Missing Authorization header",
                    "message": "Use 'Authorization: Bearer <api-key>' header"
                })),
            )
                .into_response()
        })?;

    let provided_key = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Invalid Authorization header format",
                "message": "Use 'Authorization: Bearer <api-key>' header"
            })),
        )
            .into_response()
    })?;

    if provided_key != expected_key {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Invalid API key"
            })),
        )
            .into_response());
    }

    Ok(())
}

fn parse_usize_param(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<Option<usize>> {
    params
        .get(name)
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| {
                JournalGraphError::InvalidInput(format!("{} must be a non-negative integer", name))
            })
        })
        .transpose()
}

/// Map a service error onto the HTTP error envelope.
fn error_response(err: JournalGraphError) -> Response {
    let status = match &err {
        JournalGraphError::NotFound(_) => StatusCode::NOT_FOUND,
        JournalGraphError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        JournalGraphError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        JournalGraphError::Database(_)
        | JournalGraphError::Io(_)
        | JournalGraphError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        log::error!("request failed: {}", err);
    }

    (
        status,
        Json(serde_json::json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                JournalGraphError::NotFound("entry x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                JournalGraphError::InvalidInput("bad depth".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                JournalGraphError::DeadlineExceeded("slow".to_string()),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                JournalGraphError::Database(rusqlite::Error::InvalidQuery),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(err).status(), expected);
        }
    }

    #[test]
    fn test_validate_auth() {
        let mut headers = HeaderMap::new();
        assert!(validate_auth(&headers, "secret").is_err());

        headers.insert("authorization", "Bearer secret".parse().unwrap());
        assert!(validate_auth(&headers, "secret").is_ok());

        headers.insert("authorization", "Bearer wrong".parse().unwrap());
        assert!(validate_auth(&headers, "secret").is_err());

        headers.insert("authorization", "Basic secret".parse().unwrap());
        assert!(validate_auth(&headers, "secret").is_err());
    }

    #[test]
    fn test_parse_usize_param() {
        let mut params = HashMap::new();
        assert_eq!(parse_usize_param(&params, "limit").unwrap(), None);

        params.insert("limit".to_string(), "5".to_string());
        assert_eq!(parse_usize_param(&params, "limit").unwrap(), Some(5));

        params.insert("limit".to_string(), "many".to_string());
        assert!(parse_usize_param(&params, "limit").is_err());
    }
}
