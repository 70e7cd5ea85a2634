use std::sync::Arc;

use survey_contracts::{NewSurvey, Survey, SurveyId};
use survey_policy::validate_new_survey;
use survey_store::SurveyStore;

use crate::{Clock, NotFoundKind, ServiceError};

#[derive(Clone)]
pub struct SurveyService {
    store: Arc<dyn SurveyStore>,
    clock: Arc<dyn Clock>,
}

impl SurveyService {
    pub fn new(store: Arc<dyn SurveyStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_survey(&self, survey: NewSurvey) -> Result<Survey, ServiceError> {
        let messages = validate_new_survey(&survey);
        if !messages.is_empty() {
            return Err(ServiceError::ValidationFailed { messages });
        }

        let created = self.store.insert_survey(&survey, self.clock.now()).await?;
        tracing::info!(survey_id = created.id, "survey created");
        Ok(created)
    }

    pub async fn list_surveys(&self) -> Result<Vec<Survey>, ServiceError> {
        Ok(self.store.list_surveys().await?)
    }

    pub async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, ServiceError> {
        self.store
            .fetch_survey(survey_id)
            .await?
            .ok_or(ServiceError::NotFound(NotFoundKind::Survey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use chrono::{TimeDelta, TimeZone, Utc};
    use survey_contracts::{NewSurveyResponse, ResponseData};
    use survey_store::MemorySurveyStore;

    fn service() -> (SurveyService, Arc<MemorySurveyStore>, Arc<ManualClock>) {
        let store = Arc::new(MemorySurveyStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        (
            SurveyService::new(store.clone(), clock.clone()),
            store,
            clock,
        )
    }

    fn new_survey(title: &str, description: &str) -> NewSurvey {
        NewSurvey {
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_list_returns_single_survey_with_zero_count() {
        let (service, _, clock) = service();

        let created = service
            .create_survey(new_survey("Test Survey", "Test Description"))
            .await
            .expect("create should succeed");
        assert_eq!(created.title, "Test Survey");
        assert_eq!(created.description, "Test Description");
        assert_eq!(created.responses_count, 0);
        assert_eq!(created.created_at, clock.now());
        assert_eq!(created.updated_at, created.created_at);

        let listed = service.list_surveys().await.expect("list should succeed");
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn empty_description_is_accepted() {
        let (service, _, _) = service();
        let created = service
            .create_survey(new_survey("Quick poll", ""))
            .await
            .expect("empty description should be accepted");
        assert_eq!(created.description, "");
    }

    #[tokio::test]
    async fn invalid_survey_reports_every_violation_and_writes_nothing() {
        let (service, _, _) = service();

        let err = service
            .create_survey(new_survey("ab", &"x".repeat(1001)))
            .await
            .expect_err("create should fail");
        match err {
            ServiceError::ValidationFailed { messages } => assert_eq!(
                messages,
                vec![
                    "Title must be at least 3 characters long".to_string(),
                    "Description must be less than 1000 characters".to_string(),
                ]
            ),
            other => panic!("expected validation failure, got {other:?}"),
        }

        let err = service
            .create_survey(new_survey(&"t".repeat(256), "fine"))
            .await
            .expect_err("create should fail");
        assert!(matches!(
            err,
            ServiceError::ValidationFailed { ref messages }
                if messages == &vec!["Title must be less than 255 characters".to_string()]
        ));

        assert!(
            service
                .list_surveys()
                .await
                .expect("list should succeed")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn get_survey_reports_missing_and_live_count() {
        let (service, store, clock) = service();

        let err = service.get_survey(999).await.expect_err("should be missing");
        assert!(matches!(err, ServiceError::NotFound(NotFoundKind::Survey)));

        let created = service
            .create_survey(new_survey("Customer Satisfaction Survey", "Feedback"))
            .await
            .expect("create should succeed");
        store
            .insert_response(
                created.id,
                &NewSurveyResponse {
                    user_identifier: "user123".to_string(),
                    response_data: ResponseData::from_json(
                        r#"{"overall_satisfaction": "5"}"#.to_string(),
                    )
                    .expect("valid json"),
                },
                clock.now(),
            )
            .await
            .expect("insert should succeed");

        let fetched = service
            .get_survey(created.id)
            .await
            .expect("get should succeed");
        assert_eq!(fetched.responses_count, 1);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_repeatable() {
        let (service, _, clock) = service();

        let first = service
            .create_survey(new_survey("First survey", "a"))
            .await
            .expect("create should succeed");
        clock.advance(TimeDelta::seconds(1));
        let second = service
            .create_survey(new_survey("Second survey", "b"))
            .await
            .expect("create should succeed");

        let a = service.list_surveys().await.expect("list should succeed");
        let b = service.list_surveys().await.expect("list should succeed");
        assert_eq!(a, b);
        assert_eq!(
            a.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }
}
