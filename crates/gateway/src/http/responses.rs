use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use survey_contracts::{NewSurveyResponse, SurveyResponse, SurveyResponseUpdate, UserResponse};
use survey_service::ServiceError;

use super::{
    ApiResult, AppState, invalid_body, json_error, observe, parse_response_id, parse_survey_id,
    service_error, success,
};

#[derive(Debug, Deserialize)]
struct CreateResponseRequest {
    survey_response: NewSurveyResponse,
}

/// The wrapper and `response_data` are both optional on update; a JSON
/// `null` is read as absent.
#[derive(Debug, Default, Deserialize)]
struct UpdateResponseRequest {
    #[serde(default)]
    survey_response: Option<SurveyResponseUpdate>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/surveys/{id}/responses",
            get(list_responses).post(create_response),
        )
        .route(
            "/api/surveys/{id}/responses/{response_id}",
            get(get_response).patch(update_response),
        )
        .route(
            "/api/users/{user_identifier}/responses",
            get(list_user_responses),
        )
}

async fn list_responses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    observe(
        "/api/surveys/{id}/responses",
        "GET",
        &headers,
        list_responses_inner(&state, &id),
    )
    .await
}

async fn list_responses_inner(state: &AppState, id: &str) -> ApiResult<Vec<SurveyResponse>> {
    let survey_id = parse_survey_id(id)?;
    let responses = state
        .responses
        .list_responses(survey_id)
        .await
        .map_err(|err| service_error(err, "Failed to fetch responses"))?;
    success(StatusCode::OK, None, responses)
}

async fn create_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    req: Result<Json<CreateResponseRequest>, JsonRejection>,
) -> Response {
    observe(
        "/api/surveys/{id}/responses",
        "POST",
        &headers,
        create_response_inner(&state, &id, req),
    )
    .await
}

async fn create_response_inner(
    state: &AppState,
    id: &str,
    req: Result<Json<CreateResponseRequest>, JsonRejection>,
) -> ApiResult<SurveyResponse> {
    let survey_id = parse_survey_id(id)?;

    // A missing survey is reported before anything about the body.
    state
        .responses
        .require_survey(survey_id)
        .await
        .map_err(|err| service_error(err, "Failed to fetch survey"))?;

    let Json(req) = req.map_err(|rejection| invalid_body(&rejection))?;
    if req.survey_response.response_data.is_null() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "Invalid request data",
            vec!["survey_response.response_data is required".to_string()],
        ));
    }

    let created = state
        .responses
        .create_response(survey_id, req.survey_response)
        .await
        .map_err(|err| {
            if matches!(err, ServiceError::ValidationFailed { .. }) {
                crate::metrics::observe_validation_failure("survey_response");
            }
            service_error(err, "Failed to submit survey response")
        })?;
    success(
        StatusCode::CREATED,
        Some("Survey response submitted successfully"),
        created,
    )
}

async fn get_response(
    State(state): State<AppState>,
    Path((id, response_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    observe(
        "/api/surveys/{id}/responses/{response_id}",
        "GET",
        &headers,
        get_response_inner(&state, &id, &response_id),
    )
    .await
}

async fn get_response_inner(
    state: &AppState,
    id: &str,
    response_id: &str,
) -> ApiResult<SurveyResponse> {
    let survey_id = parse_survey_id(id)?;
    let response_id = parse_response_id(response_id)?;
    let response = state
        .responses
        .get_response(survey_id, response_id)
        .await
        .map_err(|err| service_error(err, "Failed to fetch response"))?;
    success(StatusCode::OK, None, response)
}

async fn update_response(
    State(state): State<AppState>,
    Path((id, response_id)): Path<(String, String)>,
    headers: HeaderMap,
    req: Result<Json<UpdateResponseRequest>, JsonRejection>,
) -> Response {
    observe(
        "/api/surveys/{id}/responses/{response_id}",
        "PATCH",
        &headers,
        update_response_inner(&state, &id, &response_id, req),
    )
    .await
}

async fn update_response_inner(
    state: &AppState,
    id: &str,
    response_id: &str,
    req: Result<Json<UpdateResponseRequest>, JsonRejection>,
) -> ApiResult<SurveyResponse> {
    let survey_id = parse_survey_id(id)?;
    let response_id = parse_response_id(response_id)?;

    // Existence and the edit window are checked before the body is read.
    let current = state
        .responses
        .require_editable(survey_id, response_id)
        .await
        .map_err(|err| service_error(err, "Failed to fetch response"))?;

    let Json(req) = req.map_err(|rejection| invalid_body(&rejection))?;
    let update = req.survey_response.unwrap_or_default();

    let updated = state
        .responses
        .apply_update(current, update)
        .await
        .map_err(|err| service_error(err, "Failed to update survey response"))?;
    success(
        StatusCode::OK,
        Some("Survey response updated successfully"),
        updated,
    )
}

async fn list_user_responses(
    State(state): State<AppState>,
    Path(user_identifier): Path<String>,
    headers: HeaderMap,
) -> Response {
    observe(
        "/api/users/{user_identifier}/responses",
        "GET",
        &headers,
        list_user_responses_inner(&state, &user_identifier),
    )
    .await
}

async fn list_user_responses_inner(
    state: &AppState,
    user_identifier: &str,
) -> ApiResult<Vec<UserResponse>> {
    let responses = state
        .responses
        .list_responses_by_user(user_identifier)
        .await
        .map_err(|err| service_error(err, "Failed to fetch user responses"))?;
    success(StatusCode::OK, None, responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_identifier_and_data() {
        let ok: CreateResponseRequest = serde_json::from_str(
            r#"{"survey_response": {"user_identifier": "", "response_data": {"q1": "a"}}}"#,
        )
        .expect("empty identifier reaches validation");
        assert_eq!(ok.survey_response.user_identifier, "");

        for body in [
            "{}",
            r#"{"survey_response": {"response_data": {}}}"#,
            r#"{"survey_response": {"user_identifier": "user123"}}"#,
        ] {
            assert!(
                serde_json::from_str::<CreateResponseRequest>(body).is_err(),
                "{body}"
            );
        }

        // Explicit null parses; the handler rejects it as absent.
        let null_data: CreateResponseRequest = serde_json::from_str(
            r#"{"survey_response": {"user_identifier": "user123", "response_data": null}}"#,
        )
        .expect("null parses");
        assert!(null_data.survey_response.response_data.is_null());
    }

    #[test]
    fn create_request_keeps_payload_text() {
        let req: CreateResponseRequest = serde_json::from_str(
            r#"{"survey_response": {"user_identifier": "user123", "response_data": {"z":"last","a":"first","big":123456789012345678901234567890,"f":1.10}}}"#,
        )
        .expect("request parses");
        assert_eq!(
            req.survey_response.response_data.as_str(),
            r#"{"z":"last","a":"first","big":123456789012345678901234567890,"f":1.10}"#
        );
    }

    #[test]
    fn update_request_treats_null_and_missing_as_absent() {
        for body in [
            "{}",
            r#"{"survey_response": null}"#,
            r#"{"survey_response": {}}"#,
            r#"{"survey_response": {"response_data": null}}"#,
        ] {
            let req: UpdateResponseRequest = serde_json::from_str(body).expect("update parses");
            assert!(
                req.survey_response.unwrap_or_default().response_data.is_none(),
                "{body}"
            );
        }

        let req: UpdateResponseRequest =
            serde_json::from_str(r#"{"survey_response": {"response_data": {"rating": "4"}}}"#)
                .expect("update parses");
        assert_eq!(
            req.survey_response
                .and_then(|u| u.response_data)
                .as_ref()
                .map(|data| data.as_str()),
            Some(r#"{"rating": "4"}"#)
        );
    }
}
