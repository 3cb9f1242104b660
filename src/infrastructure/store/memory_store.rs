use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::traits::{SessionStore, TokenBlacklist};
use crate::domain::{DeviceClass, Session, SessionStats};
use crate::error::AppResult;
use crate::security::Clock;

/// Process-local session store. Used when no store URL is configured and by
/// the test suite; records are reaped lazily against the injected clock.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|e| {
            tracing::warn!("session map lock was poisoned, recovering the lock");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|e| {
            tracing::warn!("session map lock was poisoned, recovering the lock");
            e.into_inner()
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> AppResult<()> {
        self.write()
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, session_id: &str) -> AppResult<Option<Session>> {
        let now = self.clock.now();
        Ok(self
            .read()
            .get(session_id)
            .filter(|session| !session.is_expired(now))
            .cloned())
    }

    async fn update(&self, session: &Session) -> AppResult<()> {
        self.write()
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> AppResult<bool> {
        let now = self.clock.now();
        let removed = self.write().remove(session_id);
        // An expired record is already logically gone.
        Ok(removed.is_some_and(|session| !session.is_expired(now)))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let now = self.clock.now();
        let mut sessions = self.write();
        let mut removed = 0u64;
        sessions.retain(|_, session| {
            if session.user_id == user_id {
                if !session.is_expired(now) {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let now = self.clock.now();
        let mut sessions: Vec<Session> = self
            .read()
            .values()
            .filter(|session| session.user_id == user_id && !session.is_expired(now))
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    async fn stats(&self) -> AppResult<SessionStats> {
        let now = self.clock.now();
        let mut stats = SessionStats::default();
        for session in self.read().values() {
            if session.is_expired(now) {
                continue;
            }
            stats.active_sessions += 1;
            match session.device_type {
                DeviceClass::Desktop => stats.by_device_type.desktop += 1,
                DeviceClass::Mobile => stats.by_device_type.mobile += 1,
            }
            if session.remember {
                stats.remembered_sessions += 1;
            }
        }
        Ok(stats)
    }

    async fn cleanup_expired(&self) -> AppResult<u64> {
        let now = self.clock.now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

/// Process-local blacklist counterpart to [`InMemorySessionStore`].
pub struct InMemoryTokenBlacklist {
    entries: RwLock<HashMap<Uuid, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTokenBlacklist {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryTokenBlacklist {
    async fn add(&self, jti: Uuid, expires_at: DateTime<Utc>) -> AppResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| {
            tracing::warn!("blacklist lock was poisoned, recovering the lock");
            e.into_inner()
        });
        let now = self.clock.now();
        entries.retain(|_, until| *until > now);
        if expires_at > now {
            entries.insert(jti, expires_at);
        }
        Ok(())
    }

    async fn contains(&self, jti: Uuid) -> AppResult<bool> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| {
            tracing::warn!("blacklist lock was poisoned, recovering the lock");
            e.into_inner()
        });
        Ok(entries.get(&jti).is_some_and(|until| *until > now))
    }
}
