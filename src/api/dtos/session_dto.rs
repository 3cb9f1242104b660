use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::session::{DeviceClass, Session, SessionStats};
use crate::domain::user::{Role, VerifiedIdentity};
use crate::utils::jwt::Claims;

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    pub remember: bool,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("remember", &self.remember)
            .finish()
    }
}

#[derive(Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    /// Present on login responses only; token claims do not carry the email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<Uuid>,
    pub permissions: Vec<String>,
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("id", &self.id)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("name", &"[REDACTED]")
            .field("role", &self.role)
            .field("institution_id", &self.institution_id)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl From<&VerifiedIdentity> for UserInfo {
    fn from(identity: &VerifiedIdentity) -> Self {
        Self {
            id: identity.user_id,
            email: Some(identity.email.clone()),
            name: identity.name.clone(),
            role: identity.role,
            institution_id: identity.institution_id,
            permissions: identity.permissions.clone(),
        }
    }
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            email: None,
            name: claims.name.clone(),
            role: claims.role,
            institution_id: claims.institution_id,
            permissions: claims.permissions.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub session_id: String,
    pub user: UserInfo,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllResponse {
    pub message: String,
    pub removed_sessions: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub device_type: DeviceClass,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current_session: bool,
}

impl SessionInfo {
    pub fn from_session(session: &Session, current_session_id: &str) -> Self {
        Self {
            session_id: session.session_id.clone(),
            device_type: session.device_type,
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            expires_at: session.expires_at,
            is_current_session: session.session_id == current_session_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: UserInfo,
    pub session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBreakdownDto {
    pub desktop: u64,
    pub mobile: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatsDto {
    pub active_sessions: u64,
    pub by_device_type: DeviceBreakdownDto,
    pub remembered_sessions: u64,
}

impl From<SessionStats> for SessionStatsDto {
    fn from(stats: SessionStats) -> Self {
        Self {
            active_sessions: stats.active_sessions,
            by_device_type: DeviceBreakdownDto {
                desktop: stats.by_device_type.desktop,
                mobile: stats.by_device_type.mobile,
            },
            remembered_sessions: stats.remembered_sessions,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub stats: SessionStatsDto,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub message: String,
    pub removed_sessions: u64,
}
