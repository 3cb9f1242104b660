use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::Role;

/// Coarse client classification used by both the login throttle and the
/// session records. Mobile traffic gets looser throttle limits and its own
/// bucket in the session statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
        }
    }
}

/// User claims frozen into the session at login. Access tokens minted for
/// the session embed this snapshot, so a role change only takes effect on
/// the next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsSnapshot {
    pub name: String,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub permissions: Vec<String>,
}

/// One authenticated device. Serialized as JSON into the shared store under
/// `session:{session_id}` with a TTL of `expires_at - now` at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: Uuid,
    pub device_type: DeviceClass,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Hash reference of the refresh secret currently bound to this session.
    /// The raw refresh token is never stored; a rotated-out token stops
    /// matching this field and is thereby rejected.
    pub refresh_token_id: String,
    pub remember: bool,
    pub claims: ClaimsSnapshot,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Remaining lifetime at `now`, or None once expired.
    pub fn ttl_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.expires_at - now;
        (remaining > Duration::zero()).then_some(remaining)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBreakdown {
    pub desktop: u64,
    pub mobile: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub active_sessions: u64,
    pub by_device_type: DeviceBreakdown,
    pub remembered_sessions: u64,
}
