use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

pub type SurveyId = i64;
pub type ResponseId = i64;

/// A survey as returned to callers, annotated with its live response count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responses_count: i64,
}

/// A respondent's answers as an uninterpreted JSON document. The text is kept
/// exactly as received: key order, number spelling and whitespace inside the
/// value all survive storage and come back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseData(Box<RawValue>);

impl ResponseData {
    /// Wraps stored text, failing if it is not a single JSON value.
    pub fn from_json(json: String) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn is_null(&self) -> bool {
        self.as_str().trim() == "null"
    }
}

impl PartialEq for ResponseData {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ResponseData {}

/// The parent-survey fields embedded in a respondent's response history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySummary {
    pub id: SurveyId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: ResponseId,
    pub survey_id: SurveyId,
    pub user_identifier: String,
    pub response_data: ResponseData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: ResponseId,
    pub survey: SurveySummary,
    pub user_identifier: String,
    pub response_data: ResponseData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSurvey {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSurveyResponse {
    pub user_identifier: String,
    pub response_data: ResponseData,
}

/// Partial update of a response. `response_data` is the only mutable field;
/// `None` leaves the stored row untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<ResponseData>,
}
