use crate::config::WebConfig;
use crate::error::{AppError, AppResult};
use crate::secrets::SecretService;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, MatchedPath, Path, State},
    http::{HeaderValue, Request, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use secrets_keeper_types::{
    CreateSecretRequest, CreateSecretResponse, HealthResponse, RetrieveSecretRequest,
    RetrieveSecretResponse,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

/// Application state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub secrets: SecretService,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Store a new secret and hand back its one-time token
pub async fn create_secret(
    State(state): State<AppState>,
    payload: Result<Json<CreateSecretRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateSecretResponse>)> {
    let Json(req) = payload.map_err(|e| AppError::invalid_request(e.body_text()))?;

    let created = state
        .secrets
        .create(&req.message, req.ttl, req.passphrase.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSecretResponse {
            token: created.token,
            passphrase_required: created.passphrase_required,
        }),
    ))
}

/// Reveal and destroy a secret. The body is optional.
pub async fn retrieve_secret(
    Path(token): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<RetrieveSecretResponse>> {
    let req = parse_optional_body(&body)?;

    let revealed = state
        .secrets
        .retrieve(&token, req.passphrase.as_deref())
        .await?;

    Ok(Json(RetrieveSecretResponse {
        message: revealed.message,
        created_at: revealed.created_at,
    }))
}

fn parse_optional_body(body: &[u8]) -> AppResult<RetrieveSecretRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RetrieveSecretRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::invalid_request(e.to_string()))
}

fn cors_layer(web: &WebConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if web.allows_any_origin() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = web
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Create the web router
pub fn create_router(state: AppState, web: &WebConfig) -> Router {
    // Spans carry the route template, never the concrete path: it holds the token.
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or("unmatched");
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        info_span!("http", method = %req.method(), route, request_id)
    });

    Router::new()
        .route("/health", get(health))
        .route("/api/secrets", post(create_secret))
        .route("/api/secrets/{token}", post(retrieve_secret))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(web.request_timeout_secs),
        ))
        .layer(trace)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(web))
}
