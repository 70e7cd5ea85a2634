mod editability;
mod validation;

pub use editability::{EDIT_WINDOW_SECS, edit_window, is_editable};
pub use validation::{
    DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS, TITLE_MIN_CHARS, USER_IDENTIFIER_MAX_CHARS,
    USER_IDENTIFIER_MIN_CHARS, validate_new_response, validate_new_survey,
};
