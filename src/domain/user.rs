use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Instructor,
    Student,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Identity returned by the credential verifier on a successful login. The
/// claims portion is snapshotted into the session; the gatekeeper never
/// reads the user row again for the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub permissions: Vec<String>,
}
