use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::api::dtos::{
    CleanupResponse, ErrorResponse, LoginRequest, LoginResponse, LogoutAllResponse,
    MessageResponse, RefreshRequest, RefreshResponse, SessionInfo, SessionListResponse,
    StatsResponse, UserInfo, ValidateResponse,
};
use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{bearer_token, AdminUser};
use crate::middleware::request_context::fingerprint_from_request;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/logout-all", web::post().to(logout_all))
            .route("/refresh", web::post().to(refresh))
            .route("/list", web::get().to(list))
            .route("/destroy/{session_id}", web::delete().to(destroy))
            .route("/validate", web::get().to(validate))
            .route("/stats", web::get().to(stats))
            .route("/cleanup", web::post().to(cleanup)),
    );
}

#[utoipa::path(
    post,
    path = "/sessions/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = LoginResponse),
        (status = 400, description = "Malformed login fields", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Rate limited or request loop detected", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn login(
    state: web::Data<AppState>,
    request: HttpRequest,
    payload: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    payload.validate()?;

    let fingerprint = fingerprint_from_request(&request);
    let payload = payload.into_inner();

    let result = state
        .session_service
        .login(
            &payload.email,
            &payload.password,
            payload.remember,
            &fingerprint,
        )
        .await;

    match &result {
        Ok(_) => state.metrics.record_login_success(),
        Err(AppError::RateLimited { .. }) => state.metrics.record_rate_limited(),
        Err(AppError::LoopDetected { .. }) => state.metrics.record_loop_detected(),
        Err(AppError::Unauthorized) => state.metrics.record_auth_failure(),
        Err(_) => {}
    }
    let established = result?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: established.token,
        refresh_token: established.refresh_token,
        session_id: established.session.session_id.clone(),
        user: UserInfo::from(&established.identity),
        expires_at: established.expires_at,
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/logout",
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn logout(state: web::Data<AppState>, request: HttpRequest) -> AppResult<HttpResponse> {
    let token = bearer_token(&request)?;
    state.session_service.logout(&token).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/logout-all",
    responses(
        (status = 200, description = "All of the user's sessions revoked", body = LogoutAllResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn logout_all(
    state: web::Data<AppState>,
    request: HttpRequest,
) -> AppResult<HttpResponse> {
    let token = bearer_token(&request)?;
    let removed = state.session_service.logout_all(&token).await?;

    Ok(HttpResponse::Ok().json(LogoutAllResponse {
        message: "Logged out from all devices".to_string(),
        removed_sessions: removed,
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh access token minted", body = RefreshResponse),
        (status = 401, description = "Unknown, rotated-out, or expired refresh token", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn refresh(
    state: web::Data<AppState>,
    payload: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    payload.validate()?;

    let refreshed = state
        .session_service
        .refresh(&payload.refresh_token)
        .await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token: refreshed.token,
        refresh_token: refreshed.refresh_token,
        expires_at: refreshed.expires_at,
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/list",
    responses(
        (status = 200, description = "The caller's sessions across devices", body = SessionListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn list(state: web::Data<AppState>, request: HttpRequest) -> AppResult<HttpResponse> {
    let token = bearer_token(&request)?;
    let overview = state.session_service.list_sessions(&token).await?;

    let sessions = overview
        .sessions
        .iter()
        .map(|session| SessionInfo::from_session(session, &overview.current_session_id))
        .collect();

    Ok(HttpResponse::Ok().json(SessionListResponse { sessions }))
}

#[utoipa::path(
    delete,
    path = "/sessions/destroy/{session_id}",
    params(("session_id" = String, Path, description = "Session to destroy")),
    responses(
        (status = 200, description = "Session destroyed", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Session not found or owned by another user", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn destroy(
    state: web::Data<AppState>,
    request: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let token = bearer_token(&request)?;
    state
        .session_service
        .destroy_session(&token, &path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Session destroyed".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/validate",
    responses(
        (status = 200, description = "Session is live", body = ValidateResponse),
        (status = 401, description = "Invalid or expired session"),
        (status = 503, description = "Session store unreachable", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn validate(
    state: web::Data<AppState>,
    request: HttpRequest,
) -> AppResult<HttpResponse> {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(_) => return Ok(invalid_session_response()),
    };

    match state.session_service.validate(&token).await {
        Ok(validated) => Ok(HttpResponse::Ok().json(ValidateResponse {
            valid: true,
            user: UserInfo::from(&validated.claims),
            session_id: validated.session.session_id,
        })),
        // A store outage is not a verdict on the session; it must not be
        // reported as a plain invalid-session 401.
        Err(error @ AppError::StoreUnavailable { .. }) => Err(error),
        Err(_) => Ok(invalid_session_response()),
    }
}

fn invalid_session_response() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "valid": false,
        "message": "Invalid or expired session"
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/stats",
    responses(
        (status = 200, description = "Active session counts", body = StatsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn stats(state: web::Data<AppState>, _admin: AdminUser) -> AppResult<HttpResponse> {
    let stats = state.session_service.stats().await?;
    Ok(HttpResponse::Ok().json(StatsResponse {
        stats: stats.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/cleanup",
    responses(
        (status = 200, description = "Expired sessions swept", body = CleanupResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    ),
    tag = "sessions"
)]
pub async fn cleanup(state: web::Data<AppState>, _admin: AdminUser) -> AppResult<HttpResponse> {
    let removed = state.session_service.cleanup().await?;
    Ok(HttpResponse::Ok().json(CleanupResponse {
        message: "Expired sessions removed".to_string(),
        removed_sessions: removed,
    }))
}
