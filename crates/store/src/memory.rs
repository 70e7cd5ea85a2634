use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use survey_contracts::{
    NewSurvey, NewSurveyResponse, ResponseData, ResponseId, Survey, SurveyId, SurveySummary,
};

use crate::{ResponseRecord, StoreError, SurveyStore, UserResponseRecord};

#[derive(Debug, Clone)]
struct SurveyRow {
    id: SurveyId,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    next_survey_id: SurveyId,
    next_response_id: ResponseId,
    surveys: BTreeMap<SurveyId, SurveyRow>,
    responses: BTreeMap<ResponseId, ResponseRecord>,
}

impl Tables {
    fn responses_count(&self, survey_id: SurveyId) -> i64 {
        self.responses
            .values()
            .filter(|r| r.survey_id == survey_id)
            .count() as i64
    }

    fn survey_with_count(&self, row: &SurveyRow) -> Survey {
        Survey {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            responses_count: self.responses_count(row.id),
        }
    }
}

/// Process-local store with the same ordering and scoping rules as the
/// Postgres store. Each instance is isolated, so tests can create one apiece.
#[derive(Clone, Default)]
pub struct MemorySurveyStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn newest_updated_first(a: &ResponseRecord, b: &ResponseRecord) -> std::cmp::Ordering {
    b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl SurveyStore for MemorySurveyStore {
    async fn insert_survey(
        &self,
        survey: &NewSurvey,
        now: DateTime<Utc>,
    ) -> Result<Survey, StoreError> {
        let mut tables = self.tables();
        tables.next_survey_id += 1;
        let row = SurveyRow {
            id: tables.next_survey_id,
            title: survey.title.clone(),
            description: survey.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.surveys.insert(row.id, row.clone());
        Ok(tables.survey_with_count(&row))
    }

    async fn fetch_survey(&self, survey_id: SurveyId) -> Result<Option<Survey>, StoreError> {
        let tables = self.tables();
        Ok(tables
            .surveys
            .get(&survey_id)
            .map(|row| tables.survey_with_count(row)))
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError> {
        let tables = self.tables();
        let mut rows = tables.surveys.values().collect::<Vec<_>>();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .map(|row| tables.survey_with_count(row))
            .collect())
    }

    async fn survey_exists(&self, survey_id: SurveyId) -> Result<bool, StoreError> {
        Ok(self.tables().surveys.contains_key(&survey_id))
    }

    async fn insert_response(
        &self,
        survey_id: SurveyId,
        response: &NewSurveyResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseRecord, StoreError> {
        let mut tables = self.tables();
        // Mirrors the foreign key on survey_responses.survey_id.
        if !tables.surveys.contains_key(&survey_id) {
            return Err(StoreError::Constraint(format!(
                "survey {} does not exist",
                survey_id
            )));
        }

        tables.next_response_id += 1;
        let record = ResponseRecord {
            id: tables.next_response_id,
            survey_id,
            user_identifier: response.user_identifier.clone(),
            response_data: response.response_data.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.responses.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_response(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
    ) -> Result<Option<ResponseRecord>, StoreError> {
        Ok(self
            .tables()
            .responses
            .get(&response_id)
            .filter(|r| r.survey_id == survey_id)
            .cloned())
    }

    async fn list_responses(
        &self,
        survey_id: SurveyId,
    ) -> Result<Vec<ResponseRecord>, StoreError> {
        let mut out = self
            .tables()
            .responses
            .values()
            .filter(|r| r.survey_id == survey_id)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by(newest_updated_first);
        Ok(out)
    }

    async fn update_response_data(
        &self,
        survey_id: SurveyId,
        response_id: ResponseId,
        response_data: &ResponseData,
        now: DateTime<Utc>,
    ) -> Result<Option<ResponseRecord>, StoreError> {
        let mut tables = self.tables();
        let Some(record) = tables
            .responses
            .get_mut(&response_id)
            .filter(|r| r.survey_id == survey_id)
        else {
            return Ok(None);
        };

        record.response_data = response_data.clone();
        record.updated_at = now;
        Ok(Some(record.clone()))
    }

    async fn list_responses_by_user(
        &self,
        user_identifier: &str,
    ) -> Result<Vec<UserResponseRecord>, StoreError> {
        let tables = self.tables();
        let mut matching = tables
            .responses
            .values()
            .filter(|r| r.user_identifier == user_identifier)
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| newest_updated_first(a, b));

        // Inner-join semantics: a response whose survey row is gone is skipped.
        Ok(matching
            .into_iter()
            .filter_map(|response| {
                let survey = tables.surveys.get(&response.survey_id)?;
                Some(UserResponseRecord {
                    response: response.clone(),
                    survey: SurveySummary {
                        id: survey.id,
                        title: survey.title.clone(),
                        description: survey.description.clone(),
                    },
                })
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn new_survey(title: &str) -> NewSurvey {
        NewSurvey {
            title: title.to_string(),
            description: format!("{title} description"),
        }
    }

    fn data(json: &str) -> ResponseData {
        ResponseData::from_json(json.to_string()).expect("valid json")
    }

    fn new_response(user: &str, rating: &str) -> NewSurveyResponse {
        NewSurveyResponse {
            user_identifier: user.to_string(),
            response_data: data(&format!(r#"{{"rating":"{rating}"}}"#)),
        }
    }

    #[tokio::test]
    async fn surveys_list_newest_first_with_live_counts() {
        let store = MemorySurveyStore::new();
        let older = store
            .insert_survey(&new_survey("Older"), t0())
            .await
            .expect("insert should succeed");
        let newer = store
            .insert_survey(&new_survey("Newer"), t0() + TimeDelta::minutes(1))
            .await
            .expect("insert should succeed");
        assert_eq!(older.responses_count, 0);

        store
            .insert_response(older.id, &new_response("user123", "5"), t0())
            .await
            .expect("insert should succeed");
        store
            .insert_response(older.id, &new_response("user456", "3"), t0())
            .await
            .expect("insert should succeed");

        let listed = store.list_surveys().await.expect("list should succeed");
        assert_eq!(
            listed.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        assert_eq!(listed[0].responses_count, 0);
        assert_eq!(listed[1].responses_count, 2);

        let fetched = store
            .fetch_survey(older.id)
            .await
            .expect("fetch should succeed")
            .expect("survey should exist");
        assert_eq!(fetched.responses_count, 2);
    }

    #[tokio::test]
    async fn response_lookup_is_scoped_to_survey() {
        let store = MemorySurveyStore::new();
        let a = store
            .insert_survey(&new_survey("Survey A"), t0())
            .await
            .expect("insert should succeed");
        let b = store
            .insert_survey(&new_survey("Survey B"), t0())
            .await
            .expect("insert should succeed");
        let response = store
            .insert_response(a.id, &new_response("testuser", "5"), t0())
            .await
            .expect("insert should succeed");

        assert!(
            store
                .fetch_response(a.id, response.id)
                .await
                .expect("fetch should succeed")
                .is_some()
        );
        assert!(
            store
                .fetch_response(b.id, response.id)
                .await
                .expect("fetch should succeed")
                .is_none()
        );

        let updated = store
            .update_response_data(b.id, response.id, &data("{}"), t0())
            .await
            .expect("update should succeed");
        assert!(updated.is_none(), "cross-survey update must not match");
    }

    #[tokio::test]
    async fn update_advances_updated_at_and_reorders() {
        let store = MemorySurveyStore::new();
        let survey = store
            .insert_survey(&new_survey("Survey"), t0())
            .await
            .expect("insert should succeed");
        let first = store
            .insert_response(survey.id, &new_response("user1", "1"), t0())
            .await
            .expect("insert should succeed");
        let second = store
            .insert_response(
                survey.id,
                &new_response("user2", "2"),
                t0() + TimeDelta::minutes(1),
            )
            .await
            .expect("insert should succeed");

        let later = t0() + TimeDelta::minutes(5);
        let updated = store
            .update_response_data(survey.id, first.id, &data(r#"{"rating": "9"}"#), later)
            .await
            .expect("update should succeed")
            .expect("row should match");
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.created_at, t0());
        assert_eq!(updated.response_data.as_str(), r#"{"rating": "9"}"#);

        let listed = store
            .list_responses(survey.id)
            .await
            .expect("list should succeed");
        assert_eq!(
            listed.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn responses_by_user_match_exactly_and_embed_survey() {
        let store = MemorySurveyStore::new();
        let survey = store
            .insert_survey(&new_survey("Product Feedback Form"), t0())
            .await
            .expect("insert should succeed");
        store
            .insert_response(survey.id, &new_response("testuser", "5"), t0())
            .await
            .expect("insert should succeed");
        store
            .insert_response(survey.id, &new_response("TestUser", "1"), t0())
            .await
            .expect("insert should succeed");

        let records = store
            .list_responses_by_user("testuser")
            .await
            .expect("list should succeed");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].survey,
            SurveySummary {
                id: survey.id,
                title: "Product Feedback Form".to_string(),
                description: "Product Feedback Form description".to_string(),
            }
        );
        assert_eq!(records[0].response.user_identifier, "testuser");

        assert!(
            store
                .list_responses_by_user("test")
                .await
                .expect("list should succeed")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn response_for_missing_survey_is_rejected() {
        let store = MemorySurveyStore::new();
        let err = store
            .insert_response(42, &new_response("testuser", "5"), t0())
            .await
            .expect_err("insert should fail");
        assert!(matches!(err, StoreError::Constraint(_)));
    }
}
