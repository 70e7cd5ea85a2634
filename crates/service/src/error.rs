use survey_store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Survey,
    Response,
}

impl NotFoundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotFoundKind::Survey => "survey",
            NotFoundKind::Response => "survey response",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{} not found", .0.as_str())]
    NotFound(NotFoundKind),

    #[error("validation failed: {}", .messages.join("; "))]
    ValidationFailed { messages: Vec<String> },

    #[error("response cannot be edited after 24 hours")]
    EditWindowExpired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Stable tag for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::ValidationFailed { .. } => "validation_failed",
            ServiceError::EditWindowExpired => "edit_window_expired",
            ServiceError::Store(_) => "store_error",
        }
    }
}
