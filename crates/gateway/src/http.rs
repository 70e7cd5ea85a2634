use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use survey_service::{Clock, NotFoundKind, ResponseService, ServiceError, SurveyService, SystemClock};
use survey_store::{MemorySurveyStore, PgSurveyStore, SurveyStore};
use tracing::Instrument;
use ulid::Ulid;

use crate::config::{GatewayConfig, StartupError, StoreMode};

mod responses;
mod surveys;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    store: Arc<dyn SurveyStore>,
    surveys: SurveyService,
    responses: ResponseService,
}

impl AppState {
    pub fn new(config: GatewayConfig, store: Arc<dyn SurveyStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            surveys: SurveyService::new(store.clone(), clock.clone()),
            responses: ResponseService::new(store.clone(), clock),
            store,
        }
    }
}

/// The uniform body of every `/api` response.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

type ApiError = (StatusCode, Json<Envelope<()>>);
type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

fn success<T>(status: StatusCode, message: Option<&str>, data: T) -> ApiResult<T> {
    Ok((
        status,
        Json(Envelope {
            status: "success",
            message: message.map(str::to_string),
            data: Some(data),
            errors: None,
        }),
    ))
}

fn json_error(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> ApiError {
    (
        status,
        Json(Envelope {
            status: "error",
            message: Some(message.into()),
            data: None,
            errors: (!errors.is_empty()).then_some(errors),
        }),
    )
}

/// Maps a service failure onto the envelope. `failure_message` names the
/// operation and is used for validation and store failures.
fn service_error(err: ServiceError, failure_message: &str) -> ApiError {
    tracing::Span::current().record("error_kind", err.kind());
    match err {
        ServiceError::NotFound(NotFoundKind::Survey) => {
            json_error(StatusCode::NOT_FOUND, "Survey not found", Vec::new())
        }
        ServiceError::NotFound(NotFoundKind::Response) => {
            json_error(StatusCode::NOT_FOUND, "Survey response not found", Vec::new())
        }
        ServiceError::ValidationFailed { messages } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, failure_message, messages)
        }
        ServiceError::EditWindowExpired => {
            crate::metrics::inc_edit_window_rejection();
            json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Response cannot be edited after 24 hours",
                Vec::new(),
            )
        }
        ServiceError::Store(err) => {
            tracing::warn!(error = %err, "survey store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                failure_message,
                vec![err.to_string()],
            )
        }
    }
}

fn invalid_body(rejection: &JsonRejection) -> ApiError {
    json_error(
        StatusCode::BAD_REQUEST,
        "Invalid request data",
        vec![rejection.body_text()],
    )
}

fn parse_id(raw: &str, message: &'static str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|err| json_error(StatusCode::BAD_REQUEST, message, vec![err.to_string()]))
}

fn parse_survey_id(raw: &str) -> Result<i64, ApiError> {
    parse_id(raw, "Invalid survey ID")
}

fn parse_response_id(raw: &str) -> Result<i64, ApiError> {
    parse_id(raw, "Invalid response ID")
}

/// Runs one API handler inside a request span, records latency and outcome,
/// feeds the HTTP metrics and echoes the request id back to the caller.
async fn observe<T, F>(
    route: &'static str,
    method: &'static str,
    headers: &HeaderMap,
    handler: F,
) -> Response
where
    T: Serialize,
    F: Future<Output = ApiResult<T>>,
{
    let request_id = extract_request_id(headers);
    let span = tracing::info_span!(
        "survey_api.request",
        request_id = %request_id,
        route,
        method,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
        error_kind = tracing::field::Empty,
    );
    let started = Instant::now();

    let result = async {
        let result = handler.await;
        let status = match &result {
            Ok((status, _)) => *status,
            Err((status, _)) => *status,
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let span = tracing::Span::current();
        span.record("status", status.as_u16());
        span.record("latency_ms", latency_ms);
        span.record("outcome", if status.is_success() { "ok" } else { "error" });
        tracing::info!(status = status.as_u16(), latency_ms, "survey_api.response");
        result
    }
    .instrument(span)
    .await;

    let mut response = match result {
        Ok(ok) => ok.into_response(),
        Err(err) => err.into_response(),
    };
    crate::metrics::observe_http_request(
        route,
        method,
        response.status().as_u16(),
        started.elapsed(),
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Opens the store selected by `SURVEY_STORE_MODE`. Postgres stores are
/// migrated before they are returned.
pub async fn open_store(config: &GatewayConfig) -> Result<Arc<dyn SurveyStore>, StartupError> {
    match config.store_mode {
        StoreMode::Memory => Ok(Arc::new(MemorySurveyStore::new())),
        StoreMode::Postgres => {
            let db_url = config.db_url.as_deref().ok_or_else(|| StartupError {
                code: "ERR_MISSING_CONFIG",
                message: "missing required config key SURVEY_DB_URL".to_string(),
            })?;
            let store = PgSurveyStore::connect_and_migrate(db_url, &config.pg_store_options())
                .await
                .map_err(|err| StartupError {
                    code: "ERR_STORE_UNAVAILABLE",
                    message: format!("failed to initialize survey store: {}", err),
                })?;
            Ok(Arc::new(store))
        }
    }
}

pub async fn router(config: GatewayConfig) -> Result<Router, StartupError> {
    let store = open_store(&config).await?;
    let state = AppState::new(config, store, Arc::new(SystemClock));

    if state.config.seed_sample_data {
        crate::seed::seed_sample_data(&state.surveys, &state.responses)
            .await
            .map_err(|err| StartupError {
                code: "ERR_SEED_FAILED",
                message: format!("failed to seed sample data: {}", err),
            })?;
    }

    Ok(routes(state))
}

/// Builds the router over an already-open store and an explicit clock.
pub fn router_with_store(
    config: GatewayConfig,
    store: Arc<dyn SurveyStore>,
    clock: Arc<dyn Clock>,
) -> Router {
    routes(AppState::new(config, store, clock))
}

fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/up", get(up))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .merge(surveys::routes())
        .merge(responses::routes())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "success",
        "message": "Survey Form API",
        "endpoints": {
            "surveys": "/api/surveys",
            "responses": "/api/surveys/{id}/responses",
            "user_responses": "/api/users/{user_identifier}/responses",
        },
    }))
}

async fn up() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct ReadyzResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, bool>,
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();

    let store_ready = state.store.ping().await.is_ok();
    checks.insert("store", store_ready);

    let all_ready = checks.values().all(|ok| *ok);
    let status = if all_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyzResponse {
            status: if all_ready { "ready" } else { "not_ready" },
            checks,
        }),
    )
}

async fn metrics() -> impl IntoResponse {
    match crate::metrics::render() {
        Ok((body, content_type)) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(content_type.as_str()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (headers, body).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .and_then(sanitize_request_id)
        .unwrap_or_else(|| Ulid::new().to_string())
}

fn sanitize_request_id(raw: &str) -> Option<String> {
    const MAX_LEN: usize = 64;
    let mut out = String::with_capacity(raw.len().min(MAX_LEN));

    for ch in raw.chars() {
        if out.len() >= MAX_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        }
    }

    (!out.is_empty()).then_some(out)
}
