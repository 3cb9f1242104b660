use serde::Serialize;
use utoipa::ToSchema;

/// Shape of every error body produced by the error type's `ResponseError`
/// impl. Declared here so the OpenAPI document can reference it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    /// Error label (e.g., "Unauthorized", "Too many requests")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Stable machine-readable code (e.g., "RATE_LIMITED")
    pub code: String,
    /// Present on 429 responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}
