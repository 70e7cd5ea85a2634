use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use survey_contracts::{NewSurvey, Survey};
use survey_service::ServiceError;

use super::{ApiResult, AppState, invalid_body, observe, parse_survey_id, service_error, success};

#[derive(Debug, Deserialize)]
struct CreateSurveyRequest {
    survey: NewSurvey,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/surveys", get(list_surveys).post(create_survey))
        .route("/api/surveys/{id}", get(get_survey))
}

async fn list_surveys(State(state): State<AppState>, headers: HeaderMap) -> Response {
    observe("/api/surveys", "GET", &headers, list_surveys_inner(&state)).await
}

async fn list_surveys_inner(state: &AppState) -> ApiResult<Vec<Survey>> {
    let surveys = state
        .surveys
        .list_surveys()
        .await
        .map_err(|err| service_error(err, "Failed to fetch surveys"))?;
    success(StatusCode::OK, None, surveys)
}

async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    observe("/api/surveys/{id}", "GET", &headers, get_survey_inner(&state, &id)).await
}

async fn get_survey_inner(state: &AppState, id: &str) -> ApiResult<Survey> {
    let survey_id = parse_survey_id(id)?;
    let survey = state
        .surveys
        .get_survey(survey_id)
        .await
        .map_err(|err| service_error(err, "Failed to fetch survey"))?;
    success(StatusCode::OK, None, survey)
}

async fn create_survey(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Result<Json<CreateSurveyRequest>, JsonRejection>,
) -> Response {
    observe("/api/surveys", "POST", &headers, create_survey_inner(&state, req)).await
}

async fn create_survey_inner(
    state: &AppState,
    req: Result<Json<CreateSurveyRequest>, JsonRejection>,
) -> ApiResult<Survey> {
    let Json(req) = req.map_err(|rejection| invalid_body(&rejection))?;

    let created = state
        .surveys
        .create_survey(req.survey)
        .await
        .map_err(|err| {
            if matches!(err, ServiceError::ValidationFailed { .. }) {
                crate::metrics::observe_validation_failure("survey");
            }
            service_error(err, "Failed to create survey")
        })?;
    success(
        StatusCode::CREATED,
        Some("Survey created successfully"),
        created,
    )
}
