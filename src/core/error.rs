use actix_web::{error::ResponseError, http::header::ContentType, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Body rendered for every failure that must not leak backend detail
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Malformed caller input, e.g. a missing identifier on lookup
    #[error("{0}")]
    BadRequest(String),

    /// Caller attempted to create an entity that already carries an id
    #[error("{0}")]
    Conflict(String),

    /// No entity or row matches the requested id or query
    #[error("{0}")]
    NotFound(String),

    /// Database connection errors raised outside a repository session
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unanticipated backend failures
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::BadRequest(message)
            | AppError::Conflict(message)
            | AppError::NotFound(message) => message.clone(),
            _ => INTERNAL_ERROR_BODY.to_string(),
        };

        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, AppError::BadRequest(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }
}
