use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Stamps an unexpected 5xx with a correlation id and emits the structured
/// error event. The id only ever appears in the log stream; response bodies
/// stay generic.
pub fn capture_unexpected_5xx(
    path: &str,
    method: &str,
    status: u16,
    request_id: &str,
) -> AppResult<Uuid> {
    if !(500..600).contains(&status) {
        return Err(AppError::validation_error(
            "capture_unexpected_5xx requires an HTTP 5xx status",
        ));
    }

    let event_id = Uuid::new_v4();
    error!(
        event_id = %event_id,
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status,
        "unexpected 5xx left the server"
    );
    Ok(event_id)
}
