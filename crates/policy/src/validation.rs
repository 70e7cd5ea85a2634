use survey_contracts::{NewSurvey, NewSurveyResponse};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const USER_IDENTIFIER_MIN_CHARS: usize = 3;
pub const USER_IDENTIFIER_MAX_CHARS: usize = 100;

/// Checks every survey field constraint and returns all violations in a fixed
/// order. An empty list means the payload is valid.
pub fn validate_new_survey(survey: &NewSurvey) -> Vec<String> {
    let mut errors = Vec::new();

    let title_len = survey.title.chars().count();
    if title_len < TITLE_MIN_CHARS {
        errors.push(format!(
            "Title must be at least {} characters long",
            TITLE_MIN_CHARS
        ));
    }
    if title_len > TITLE_MAX_CHARS {
        errors.push(format!(
            "Title must be less than {} characters",
            TITLE_MAX_CHARS
        ));
    }

    // No lower bound on description: an empty one is accepted.
    if survey.description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push(format!(
            "Description must be less than {} characters",
            DESCRIPTION_MAX_CHARS
        ));
    }

    errors
}

/// `response_data` is opaque and never inspected here.
pub fn validate_new_response(response: &NewSurveyResponse) -> Vec<String> {
    let mut errors = Vec::new();

    let len = response.user_identifier.chars().count();
    if len < USER_IDENTIFIER_MIN_CHARS {
        errors.push(format!(
            "User identifier must be at least {} characters long",
            USER_IDENTIFIER_MIN_CHARS
        ));
    }
    if len > USER_IDENTIFIER_MAX_CHARS {
        errors.push(format!(
            "User identifier must be less than {} characters",
            USER_IDENTIFIER_MAX_CHARS
        ));
    }

    errors
}
