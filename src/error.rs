use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")] Storage(#[from] sea_orm::DbErr),

    #[error("Invalid input: {0}")] Validation(String),

    #[error("Missing required field: {0}")] MissingField(&'static str),

    #[error("{0} not found")] NotFound(String),

    #[error("No verification code for this phone")]
    CodeNotFound,

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Verification code does not match")]
    CodeMismatch,

    #[error("No rate configured for {origin} -> {destination}")] NoRoute {
        origin: String,
        destination: String,
    },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")] Forbidden(String),

    #[error("Cannot {action} while transaction is '{status}'")] InvalidTransition {
        action: &'static str,
        status: String,
    },

    #[error("Conflict: {0}")] Conflict(String),

    #[error("Too many requests, retry in {retry_after_secs}s")] RateLimited {
        retry_after_secs: i64,
    },

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message, field) = match self {
            AppError::Storage(_) =>
                ("STORAGE_ERROR", "The request could not be completed".to_string(), None),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone(), None),
            AppError::MissingField(field) =>
                (
                    "VALIDATION_ERROR",
                    format!("Missing required field: {}", field),
                    Some(field.to_string()),
                ),
            AppError::NotFound(what) => ("NOT_FOUND", format!("{} not found", what), None),
            // Clients get one answer for every verification failure
            AppError::CodeNotFound | AppError::CodeExpired | AppError::CodeMismatch =>
                (
                    "INVALID_CODE",
                    "Invalid or expired verification code".to_string(),
                    Some("code".to_string()),
                ),
            AppError::NoRoute { .. } => ("NO_ROUTE", self.to_string(), None),
            AppError::Unauthorized => ("UNAUTHORIZED", self.to_string(), None),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg.clone(), None),
            AppError::InvalidTransition { .. } => ("INVALID_TRANSITION", self.to_string(), None),
            AppError::Conflict(msg) => ("CONFLICT", msg.clone(), None),
            AppError::RateLimited { .. } => ("RATE_LIMITED", self.to_string(), None),
            AppError::Config(msg) => ("CONFIG_ERROR", msg.clone(), None),
            AppError::Internal(_) =>
                ("INTERNAL_ERROR", "The request could not be completed".to_string(), None),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            | AppError::Validation(_)
            | AppError::MissingField(_)
            | AppError::CodeNotFound
            | AppError::CodeExpired
            | AppError::CodeMismatch => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::NoRoute { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_failures_share_one_client_message() {
        let expired = AppError::CodeExpired.to_error_response();
        let mismatch = AppError::CodeMismatch.to_error_response();
        let missing = AppError::CodeNotFound.to_error_response();

        assert_eq!(expired.error.code, "INVALID_CODE");
        assert_eq!(expired.error.message, mismatch.error.message);
        assert_eq!(mismatch.error.message, missing.error.message);
    }

    #[test]
    fn test_storage_errors_hide_detail() {
        let err = AppError::Storage(sea_orm::DbErr::Custom("connection refused on 10.0.0.3".into()));
        let response = err.to_error_response();

        assert_eq!(response.error.code, "STORAGE_ERROR");
        assert!(!response.error.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_missing_field_names_the_field() {
        let response = AppError::MissingField("holder_name").to_error_response();
        assert_eq!(response.error.field.as_deref(), Some("holder_name"));
    }
}
