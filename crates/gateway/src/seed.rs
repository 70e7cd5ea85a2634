use serde_json::json;
use survey_contracts::{NewSurvey, NewSurveyResponse, ResponseData};
use survey_service::{ResponseService, ServiceError, SurveyService};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("invalid sample payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held surveys; nothing was written.
    Skipped { existing_surveys: usize },
    Seeded { surveys: usize, responses: usize },
}

struct SampleSurvey {
    title: &'static str,
    description: &'static str,
    responses: Vec<(&'static str, serde_json::Value)>,
}

fn sample_surveys() -> Vec<SampleSurvey> {
    vec![
        SampleSurvey {
            title: "Customer Satisfaction Survey",
            description: "Help us improve our services by providing your feedback on your recent experience.",
            responses: vec![
                (
                    "user123",
                    json!({
                        "overall_satisfaction": "5",
                        "service_quality": "4",
                        "recommendation_likelihood": "5",
                        "comments": "Great service, very satisfied!",
                    }),
                ),
                (
                    "user456",
                    json!({
                        "overall_satisfaction": "3",
                        "service_quality": "4",
                        "recommendation_likelihood": "3",
                        "comments": "Service was okay, room for improvement.",
                    }),
                ),
            ],
        },
        SampleSurvey {
            title: "Employee Engagement Survey",
            description: "We value your opinion! Please share your thoughts about workplace culture and satisfaction.",
            responses: vec![(
                "employee001",
                json!({
                    "workplace_culture": "4",
                    "job_satisfaction": "5",
                    "work_life_balance": "4",
                    "management_support": "5",
                    "suggestions": "More team building activities would be great!",
                }),
            )],
        },
        SampleSurvey {
            title: "Product Feedback Form",
            description: "Tell us what you think about our latest product features and how we can make them better.",
            responses: vec![(
                "customer789",
                json!({
                    "product_rating": "4",
                    "feature_usefulness": "5",
                    "ease_of_use": "4",
                    "additional_features": "Mobile app would be helpful",
                    "overall_impression": "Very good product!",
                }),
            )],
        },
    ]
}

/// Writes the sample surveys and responses through the services, so every row
/// passes the same validation as API traffic. Existing data is never touched:
/// a store that already holds surveys is left as is.
pub async fn seed_sample_data(
    surveys: &SurveyService,
    responses: &ResponseService,
) -> Result<SeedOutcome, SeedError> {
    let existing_surveys = surveys.list_surveys().await?.len();
    if existing_surveys > 0 {
        tracing::info!(existing_surveys, "sample data skipped");
        return Ok(SeedOutcome::Skipped { existing_surveys });
    }

    let mut survey_count = 0;
    let mut response_count = 0;
    for sample in sample_surveys() {
        let survey = surveys
            .create_survey(NewSurvey {
                title: sample.title.to_string(),
                description: sample.description.to_string(),
            })
            .await?;
        survey_count += 1;

        for (user_identifier, payload) in sample.responses {
            let response_data = ResponseData::from_json(payload.to_string())?;
            responses
                .create_response(
                    survey.id,
                    NewSurveyResponse {
                        user_identifier: user_identifier.to_string(),
                        response_data,
                    },
                )
                .await?;
            response_count += 1;
        }
    }

    tracing::info!(
        surveys = survey_count,
        responses = response_count,
        "sample data created"
    );
    Ok(SeedOutcome::Seeded {
        surveys: survey_count,
        responses: response_count,
    })
}
