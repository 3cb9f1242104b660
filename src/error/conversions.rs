use validator::{ValidationErrors, ValidationErrorsKind};

use crate::error::app_error::{AppError, ValidationIssue};

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::StoreUnavailable {
                    service: "database".to_string(),
                    message: "Service temporarily unavailable. Please try again later."
                        .to_string(),
                }
            }
            sqlx::Error::Database(database_error)
                if is_connection_sqlstate(database_error.code().as_deref()) =>
            {
                AppError::StoreUnavailable {
                    service: "database".to_string(),
                    message: "Service temporarily unavailable. Please try again later."
                        .to_string(),
                }
            }
            other => AppError::DatabaseError(other),
        }
    }
}

// connection_exception class plus too_many_connections
fn is_connection_sqlstate(code: Option<&str>) -> bool {
    matches!(code, Some("08001") | Some("08006") | Some("53300"))
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        tracing::warn!(error = %err, "session store operation failed");
        AppError::store_unavailable("session-store")
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        let mut issues = flatten_validation_errors(&err);
        issues.sort_by(|left, right| {
            left.field
                .cmp(&right.field)
                .then(left.code.cmp(&right.code))
        });

        let message = match issues.as_slice() {
            [issue] => issue.message.clone(),
            _ => "Request validation failed".to_string(),
        };

        AppError::ValidationError { message, issues }
    }
}

/// Walks nested `ValidationErrors` and emits one issue per failed rule, using
/// dotted paths for nested structs and `field[index]` for list entries.
fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    push_issues("", errors, &mut issues);
    issues
}

fn push_issues(prefix: &str, errors: &ValidationErrors, issues: &mut Vec<ValidationIssue>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = failure
                        .message
                        .as_deref()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{path} is invalid"));
                    issues.push(ValidationIssue {
                        field: path.clone(),
                        message,
                        code: failure.code.to_string(),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => push_issues(&path, nested, issues),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    push_issues(&format!("{path}[{index}]"), nested, issues);
                }
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        }
    }
}
