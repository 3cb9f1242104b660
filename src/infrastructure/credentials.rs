use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Role, VerifiedIdentity};
use crate::error::{AppError, AppResult};
use crate::utils::hash::verify_password;

/// Checks an email/password pair against the portal directory. Every failure
/// mode collapses to `Unauthorized` so a caller cannot tell an unknown
/// account from a wrong password or a deactivated one.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str) -> AppResult<VerifiedIdentity>;
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    name: String,
    role: Role,
    institution_id: Option<Uuid>,
    permissions: Vec<String>,
    password_hash: String,
    is_active: bool,
}

/// Verifier backed by the portal's user directory in Postgres.
pub struct PgCredentialVerifier {
    pool: PgPool,
}

impl PgCredentialVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialVerifier for PgCredentialVerifier {
    async fn verify(&self, email: &str, password: &str) -> AppResult<VerifiedIdentity> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, email, name, role, institution_id, permissions, password_hash, is_active
            FROM portal_users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::Unauthorized)?;

        if !row.is_active {
            return Err(AppError::Unauthorized);
        }

        if !verify_password(password, &row.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(VerifiedIdentity {
            user_id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            institution_id: row.institution_id,
            permissions: row.permissions,
        })
    }
}
