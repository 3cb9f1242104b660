use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use campus_backend::domain::{Role, Session, SessionStats, VerifiedIdentity};
use campus_backend::error::{AppError, AppResult};
use campus_backend::infrastructure::credentials::CredentialVerifier;
use campus_backend::infrastructure::store::SessionStore;

/// Scripted credential directory keyed by lowercased email. Verification
/// behaves like the real one: any mismatch collapses to `Unauthorized`.
#[derive(Default)]
pub struct MockDirectory {
    accounts: Mutex<HashMap<String, (String, VerifiedIdentity)>>,
}

impl MockDirectory {
    pub fn insert(&self, password: &str, identity: VerifiedIdentity) {
        self.accounts
            .lock()
            .expect("accounts mutex poisoned")
            .insert(
                identity.email.to_lowercase(),
                (password.to_string(), identity),
            );
    }

    pub fn seed(&self, email: &str, password: &str, name: &str, role: Role) -> VerifiedIdentity {
        let identity = VerifiedIdentity {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            institution_id: Some(Uuid::new_v4()),
            permissions: permissions_for(role),
        };
        self.insert(password, identity.clone());
        identity
    }
}

fn permissions_for(role: Role) -> Vec<String> {
    match role {
        Role::Admin => vec!["sessions:manage".to_string(), "users:read".to_string()],
        Role::Staff => vec!["subjects:read".to_string()],
        Role::Instructor => vec!["subjects:read".to_string(), "grades:write".to_string()],
        Role::Student => Vec::new(),
    }
}

#[async_trait]
impl CredentialVerifier for MockDirectory {
    async fn verify(&self, email: &str, password: &str) -> AppResult<VerifiedIdentity> {
        let accounts = self.accounts.lock().expect("accounts mutex poisoned");
        match accounts.get(&email.to_lowercase()) {
            Some((stored, identity)) if stored == password => Ok(identity.clone()),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Session store that fails every call the way a dead backing service would.
pub struct UnreachableSessionStore;

#[async_trait]
impl SessionStore for UnreachableSessionStore {
    async fn create(&self, _session: &Session) -> AppResult<()> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn get(&self, _session_id: &str) -> AppResult<Option<Session>> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn update(&self, _session: &Session) -> AppResult<()> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn delete(&self, _session_id: &str) -> AppResult<bool> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn delete_all_for_user(&self, _user_id: Uuid) -> AppResult<u64> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn list_for_user(&self, _user_id: Uuid) -> AppResult<Vec<Session>> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn stats(&self) -> AppResult<SessionStats> {
        Err(AppError::store_unavailable("session-store"))
    }

    async fn cleanup_expired(&self) -> AppResult<u64> {
        Err(AppError::store_unavailable("session-store"))
    }
}
