use async_trait::async_trait;
use chrono::{DateTime, Utc};
use survey_contracts::{
    NewSurvey, NewSurveyResponse, ResponseData, ResponseId, Survey, SurveyId, SurveySummary,
};

mod memory;
mod postgres;

pub use memory::MemorySurveyStore;
pub use postgres::{PgStoreOptions, PgSurveyStore, migrate, migrate_url};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,

    #[error("store sql error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("store migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("store constraint violation: {0}")]
    Constraint(String),
}

/// A response row exactly as persisted. Derived fields such as editability are
/// computed by callers at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub survey_id: SurveyId,
    pub user_identifier: String,
    pub response_data: ResponseData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserResponseRecord {
    pub response: ResponseRecord,
    pub survey: SurveySummary,
}

/// Parameterized access to the relational store. Implementations own no
/// business rules: validation, existence ordering and the edit window are
/// enforced by the services on top.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Persists a survey with `created_at = updated_at = now` and returns it
    /// with `responses_count = 0`.
    async fn insert_survey(
        &self,
        survey: &NewSurvey,
        now: DateTime<Utc>,
    ) -> Result<Survey, StoreError>;

    async fn fetch_survey(&self, survey_id: SurveyId) -> Result<Option<Survey>, StoreError>;

    /// All surveys, newest first, each with its live response count. Surveys
    /// without responses are included with a count of zero.
    async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError>;

    async fn survey_exists(&self, survey_id: SurveyId) -> Result<bool, StoreError>;

    async fn insert_response(
        &self,
        survey_id: SurveyId,
        response: &NewSurveyResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseRecord, StoreError>;

    /// Survey-scoped lookup: a response id that belongs to another survey is
    /// reported as absent.
    async fn fetch_response(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
    ) -> Result<Option<ResponseRecord>, StoreError>;

    /// Responses of one survey, most recently updated first.
    async fn list_responses(
        &self,
        survey_id: SurveyId,
    ) -> Result<Vec<ResponseRecord>, StoreError>;

    /// Overwrites `response_data` and advances `updated_at`. Returns `None` when
    /// no row matched the scoped id.
    async fn update_response_data(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
        response_data: &ResponseData,
        now: DateTime<Utc>,
    ) -> Result<Option<ResponseRecord>, StoreError>;

    /// Every response whose `user_identifier` matches exactly (case-sensitive),
    /// joined with its parent survey, most recently updated first.
    async fn list_responses_by_user(
        &self,
        user_identifier: &str,
    ) -> Result<Vec<UserResponseRecord>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
