use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};

use crate::api::routes::AppState;
use crate::application::ValidatedSession;
use crate::error::{AppError, AppResult};

/// Pulls the raw bearer token out of the Authorization header. A missing or
/// malformed header is indistinguishable from a bad token at the HTTP level.
pub fn bearer_token(req: &HttpRequest) -> AppResult<String> {
    match req.headers().get(AUTHORIZATION) {
        Some(header) => match header.to_str() {
            Ok(value) => match value.strip_prefix("Bearer ") {
                Some(token) if !token.is_empty() => Ok(token.to_string()),
                _ => Err(AppError::SessionInvalid),
            },
            Err(_) => Err(AppError::SessionInvalid),
        },
        None => Err(AppError::SessionInvalid),
    }
}

/// Extractor for endpoints that require a live session: verifies the access
/// token, consults the blacklist, and confirms the session record still
/// exists in the store.
pub struct AuthenticatedUser(pub ValidatedSession);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = AppResult<Self>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let token = bearer_token(&req)?;
            let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("missing AppState app data"))
            })?;

            let validated = state.session_service.validate(&token).await?;
            Ok(AuthenticatedUser(validated))
        })
    }
}

/// Same checks as [`AuthenticatedUser`] plus an admin-role gate.
pub struct AdminUser(pub ValidatedSession);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = AppResult<Self>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let token = bearer_token(&req)?;
            let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("missing AppState app data"))
            })?;

            let validated = state.session_service.validate(&token).await?;
            if !validated.claims.role.is_admin() {
                return Err(AppError::Forbidden("Admin role required".to_string()));
            }
            Ok(AdminUser(validated))
        })
    }
}
