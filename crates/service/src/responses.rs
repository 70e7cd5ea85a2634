use std::sync::Arc;

use chrono::{DateTime, Utc};
use survey_contracts::{
    NewSurveyResponse, ResponseId, SurveyId, SurveyResponse, SurveyResponseUpdate, UserResponse,
};
use survey_policy::{is_editable, validate_new_response};
use survey_store::{ResponseRecord, SurveyStore, UserResponseRecord};

use crate::{Clock, NotFoundKind, ServiceError};

#[derive(Clone)]
pub struct ResponseService {
    store: Arc<dyn SurveyStore>,
    clock: Arc<dyn Clock>,
}

fn annotate(record: ResponseRecord, now: DateTime<Utc>) -> SurveyResponse {
    SurveyResponse {
        editable: is_editable(record.created_at, now),
        id: record.id,
        survey_id: record.survey_id,
        user_identifier: record.user_identifier,
        response_data: record.response_data,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn annotate_user(record: UserResponseRecord, now: DateTime<Utc>) -> UserResponse {
    let UserResponseRecord { response, survey } = record;
    UserResponse {
        editable: is_editable(response.created_at, now),
        id: response.id,
        survey,
        user_identifier: response.user_identifier,
        response_data: response.response_data,
        created_at: response.created_at,
        updated_at: response.updated_at,
    }
}

impl ResponseService {
    pub fn new(store: Arc<dyn SurveyStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Fails with `NotFound(Survey)` unless the survey exists. Callers run this
    /// before decoding or validating anything else about the request.
    pub async fn require_survey(&self, survey_id: SurveyId) -> Result<(), ServiceError> {
        if self.store.survey_exists(survey_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(NotFoundKind::Survey))
        }
    }

    pub async fn create_response(
        &self,
        survey_id: SurveyId,
        response: NewSurveyResponse,
    ) -> Result<SurveyResponse, ServiceError> {
        self.require_survey(survey_id).await?;

        let messages = validate_new_response(&response);
        if !messages.is_empty() {
            return Err(ServiceError::ValidationFailed { messages });
        }

        let now = self.clock.now();
        let record = self.store.insert_response(survey_id, &response, now).await?;
        tracing::info!(survey_id, response_id = record.id, "survey response created");
        Ok(annotate(record, now))
    }

    pub async fn list_responses(
        &self,
        survey_id: SurveyId,
    ) -> Result<Vec<SurveyResponse>, ServiceError> {
        self.require_survey(survey_id).await?;

        let records = self.store.list_responses(survey_id).await?;
        let now = self.clock.now();
        Ok(records.into_iter().map(|r| annotate(r, now)).collect())
    }

    pub async fn get_response(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
    ) -> Result<SurveyResponse, ServiceError> {
        let record = self
            .store
            .fetch_response(survey_id, response_id)
            .await?
            .ok_or(ServiceError::NotFound(NotFoundKind::Response))?;
        Ok(annotate(record, self.clock.now()))
    }

    /// Fails with `NotFound(Response)` when the response is absent under this
    /// survey, and `EditWindowExpired` once 24 hours have passed since creation.
    pub async fn require_editable(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
    ) -> Result<SurveyResponse, ServiceError> {
        let current = self.get_response(survey_id, response_id).await?;
        if !current.editable {
            tracing::info!(survey_id, response_id, "edit window expired");
            return Err(ServiceError::EditWindowExpired);
        }
        Ok(current)
    }

    pub async fn update_response(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
        update: SurveyResponseUpdate,
    ) -> Result<SurveyResponse, ServiceError> {
        let current = self.require_editable(survey_id, response_id).await?;
        self.apply_update(current, update).await
    }

    /// Writes `update` over a response already returned by `require_editable`.
    /// An update without `response_data` returns `current` without a write.
    pub async fn apply_update(
        &self,
        current: SurveyResponse,
        update: SurveyResponseUpdate,
    ) -> Result<SurveyResponse, ServiceError> {
        let Some(response_data) = update.response_data else {
            return Ok(current);
        };

        let (survey_id, response_id) = (current.survey_id, current.id);
        let now = self.clock.now();
        let record = self
            .store
            .update_response_data(survey_id, response_id, &response_data, now)
            .await?
            .ok_or(ServiceError::NotFound(NotFoundKind::Response))?;
        tracing::info!(survey_id, response_id, "survey response updated");
        Ok(annotate(record, now))
    }

    pub async fn list_responses_by_user(
        &self,
        user_identifier: &str,
    ) -> Result<Vec<UserResponse>, ServiceError> {
        let records = self.store.list_responses_by_user(user_identifier).await?;
        let now = self.clock.now();
        Ok(records.into_iter().map(|r| annotate_user(r, now)).collect())
    }
}
