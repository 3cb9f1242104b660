use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Collapsed outcome for every validation failure on the session path.
    /// Callers must not learn whether the token, the blacklist, or the
    /// session record failed the check.
    #[error("Invalid or expired session")]
    SessionInvalid,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("Internal server error")]
    InternalError(#[source] anyhow::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Too many requests, retry in {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request loop detected, retry in {retry_after_seconds}s")]
    LoopDetected { retry_after_seconds: u64 },

    #[error("Service unavailable: {service}")]
    StoreUnavailable { service: String, message: String },
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = ?self, "request failed with server error");
        }

        let mut payload = serde_json::json!({
            "success": false,
            "error": self.error_label(),
            "message": self.public_message(),
            "code": self.error_code(),
        });

        if let Some(seconds) = self.retry_after_seconds() {
            payload["retryAfterSeconds"] = serde_json::json!(seconds);
        }

        if let Some(issues) = self.validation_issues() {
            payload["details"] =
                serde_json::to_value(issues).unwrap_or(serde_json::Value::Null);
        }

        HttpResponse::build(self.status_code()).json(payload)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized
            | AppError::SessionInvalid
            | AppError::TokenExpired
            | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } | AppError::LoopDetected { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::SessionInvalid => "SESSION_INVALID",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::LoopDetected { .. } => "LOOP_DETECTED",
            AppError::StoreUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn store_unavailable(service: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            service: service.into(),
            message: "Service temporarily unavailable. Please try again later.".to_string(),
        }
    }

    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            AppError::RateLimited {
                retry_after_seconds,
            }
            | AppError::LoopDetected {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }

    fn error_label(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) | AppError::InternalError(_) => "Internal server error",
            AppError::NotFound(_) => "Not found",
            AppError::Unauthorized => "Unauthorized",
            AppError::SessionInvalid => "Invalid session",
            AppError::Forbidden(_) => "Forbidden",
            AppError::ValidationError { .. } => "Validation error",
            AppError::TokenExpired => "Token expired",
            AppError::InvalidToken => "Invalid token",
            AppError::RateLimited { .. } => "Too many requests",
            AppError::LoopDetected { .. } => "Too many requests",
            AppError::StoreUnavailable { .. } => "Service unavailable",
        }
    }

    pub(super) fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
            AppError::NotFound(message) | AppError::Forbidden(message) => message.clone(),
            AppError::ValidationError { message, .. } => message.clone(),
            AppError::Unauthorized => "Invalid credentials".to_string(),
            AppError::SessionInvalid => "Invalid or expired session".to_string(),
            AppError::TokenExpired => "Token expired".to_string(),
            AppError::InvalidToken => "Invalid token".to_string(),
            AppError::RateLimited {
                retry_after_seconds,
            } => format!(
                "Too many attempts. Please wait {retry_after_seconds} seconds and try again."
            ),
            AppError::LoopDetected {
                retry_after_seconds,
            } => format!(
                "Request loop detected. Please wait {retry_after_seconds} seconds and try again."
            ),
            AppError::StoreUnavailable { message, .. } => message.clone(),
        }
    }

    fn validation_issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            AppError::ValidationError { issues, .. } if !issues.is_empty() => Some(issues),
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
