use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Session, SessionStats};
use crate::error::AppResult;

/// Shared session records, keyed by session id and indexed per user. Every
/// record carries its own expiry; implementations reap expired entries either
/// through native TTLs or lazily on read.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Writes a new session with a lifetime of `expires_at - now`.
    async fn create(&self, session: &Session) -> AppResult<()>;

    async fn get(&self, session_id: &str) -> AppResult<Option<Session>>;

    /// Rewrites an existing session, re-deriving its lifetime from
    /// `expires_at`. The expiry itself is never pushed out here.
    async fn update(&self, session: &Session) -> AppResult<()>;

    /// Removes one session. Returns true only when the store actually held a
    /// live record, so concurrent removals of the same id count once.
    async fn delete(&self, session_id: &str) -> AppResult<bool>;

    /// Removes every session belonging to `user_id` and returns how many
    /// live records the store confirmed deleting.
    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    async fn stats(&self) -> AppResult<SessionStats>;

    /// Drops expired records that native expiry has not reaped yet and
    /// returns how many were removed.
    async fn cleanup_expired(&self) -> AppResult<u64>;
}

/// Revoked access-token ids. Entries only need to outlive the token's own
/// expiry, after which the signature check rejects it anyway.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    async fn add(&self, jti: Uuid, expires_at: DateTime<Utc>) -> AppResult<()>;

    async fn contains(&self, jti: Uuid) -> AppResult<bool>;
}
