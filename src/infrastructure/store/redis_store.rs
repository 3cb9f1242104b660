use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::time::timeout;
use uuid::Uuid;

use super::traits::{SessionStore, TokenBlacklist};
use crate::config::StoreConfig;
use crate::domain::{DeviceClass, Session, SessionStats};
use crate::error::{AppError, AppResult};

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

fn user_index_key(user_id: Uuid) -> String {
    format!("user_sessions:{user_id}")
}

fn blacklist_key(jti: Uuid) -> String {
    format!("blacklist:{jti}")
}

/// Opens a managed connection to the session store. The manager reconnects
/// on its own after transient failures; individual operations still carry
/// their own deadline.
pub async fn connect(url: &str, config: &StoreConfig) -> AppResult<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let manager = timeout(
        Duration::from_millis(config.op_timeout_ms),
        client.get_connection_manager(),
    )
    .await
    .map_err(|_| AppError::store_unavailable("session-store"))??;
    Ok(manager)
}

/// Session records in the shared store. Each session lives under
/// `session:{id}` with a native TTL and is indexed in a per-user set so
/// logout-all and the device list never have to scan.
pub struct RedisSessionStore {
    manager: ConnectionManager,
    op_timeout: Duration,
    scan_batch: usize,
}

impl RedisSessionStore {
    pub fn new(manager: ConnectionManager, config: &StoreConfig) -> Self {
        Self {
            manager,
            op_timeout: Duration::from_millis(config.op_timeout_ms),
            scan_batch: config.scan_batch.max(1),
        }
    }

    /// Runs one store operation under the configured deadline. A timeout is
    /// reported the same way as a refused connection so callers fail closed.
    async fn run<T, F>(&self, op: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::from(e)),
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "session store operation timed out"
                );
                Err(AppError::store_unavailable("session-store"))
            }
        }
    }

    async fn scan_session_payloads(&self) -> AppResult<Vec<(String, String)>> {
        let scan_batch = self.scan_batch;
        let mut conn = self.manager.clone();
        self.run("scan_sessions", async move {
            let mut keys: Vec<String> = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg("session:*")
                    .arg("COUNT")
                    .arg(scan_batch)
                    .query_async(&mut conn)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }

            let mut payloads = Vec::with_capacity(keys.len());
            for chunk in keys.chunks(scan_batch) {
                let mut mget = redis::cmd("MGET");
                for key in chunk {
                    mget.arg(key);
                }
                let values: Vec<Option<String>> = mget.query_async(&mut conn).await?;
                for (key, value) in chunk.iter().zip(values) {
                    if let Some(json) = value {
                        payloads.push((key.clone(), json));
                    }
                }
            }
            Ok(payloads)
        })
        .await
    }
}

fn decode_session(session_id: &str, json: &str) -> Option<Session> {
    match serde_json::from_str::<Session>(json) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(session_id, error = %e, "dropping undecodable session record");
            None
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, session: &Session) -> AppResult<()> {
        let ttl_ms = match session.ttl_from(Utc::now()) {
            Some(ttl) => ttl.num_milliseconds().max(1) as u64,
            None => {
                tracing::warn!(
                    session_id = %session.session_id,
                    "refusing to store an already expired session"
                );
                return Ok(());
            }
        };
        let payload =
            serde_json::to_string(session).map_err(|e| AppError::InternalError(e.into()))?;
        let key = session_key(&session.session_id);
        let index = user_index_key(session.user_id);
        let session_id = session.session_id.clone();
        let mut conn = self.manager.clone();

        self.run("create", async move {
            conn.pset_ex::<_, _, ()>(&key, &payload, ttl_ms).await?;
            conn.sadd::<_, _, ()>(&index, &session_id).await?;
            Ok(())
        })
        .await
    }

    async fn get(&self, session_id: &str) -> AppResult<Option<Session>> {
        let key = session_key(session_id);
        let mut conn = self.manager.clone();
        let raw: Option<String> = self.run("get", async move { conn.get(&key).await }).await?;
        Ok(raw.and_then(|json| decode_session(session_id, &json)))
    }

    async fn update(&self, session: &Session) -> AppResult<()> {
        let ttl_ms = match session.ttl_from(Utc::now()) {
            Some(ttl) => ttl.num_milliseconds().max(1) as u64,
            None => {
                // Updating a session that just ran out amounts to removing it.
                self.delete(&session.session_id).await?;
                return Ok(());
            }
        };
        let payload =
            serde_json::to_string(session).map_err(|e| AppError::InternalError(e.into()))?;
        let key = session_key(&session.session_id);
        let mut conn = self.manager.clone();

        self.run("update", async move {
            conn.pset_ex::<_, _, ()>(&key, &payload, ttl_ms).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, session_id: &str) -> AppResult<bool> {
        let key = session_key(session_id);
        let sid = session_id.to_string();
        let mut conn = self.manager.clone();

        self.run("delete", async move {
            let raw: Option<String> = conn.get(&key).await?;
            let removed: u64 = conn.del(&key).await?;
            if let Some(json) = raw {
                if let Ok(session) = serde_json::from_str::<Session>(&json) {
                    conn.srem::<_, _, ()>(user_index_key(session.user_id), &sid)
                        .await?;
                }
            }
            Ok(removed > 0)
        })
        .await
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let index = user_index_key(user_id);
        let mut conn = self.manager.clone();

        // DEL reports how many keys actually existed, so two racing
        // logout-all calls never count the same session twice.
        self.run("delete_all_for_user", async move {
            let ids: Vec<String> = conn.smembers(&index).await?;
            let mut removed = 0u64;
            if !ids.is_empty() {
                let keys: Vec<String> = ids.iter().map(|id| session_key(id)).collect();
                removed = conn.del(&keys).await?;
            }
            conn.del::<_, ()>(&index).await?;
            Ok(removed)
        })
        .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let index = user_index_key(user_id);
        let mut conn = self.manager.clone();

        let payloads = self
            .run("list_for_user", async move {
                let ids: Vec<String> = conn.smembers(&index).await?;
                let mut found = Vec::with_capacity(ids.len());
                let mut dangling = Vec::new();
                for id in ids {
                    let value: Option<String> = conn.get(session_key(&id)).await?;
                    match value {
                        Some(json) => found.push((id, json)),
                        None => dangling.push(id),
                    }
                }
                // Index members whose record the TTL already reaped.
                if !dangling.is_empty() {
                    conn.srem::<_, _, ()>(&index, &dangling).await?;
                }
                Ok(found)
            })
            .await?;

        let mut sessions: Vec<Session> = payloads
            .iter()
            .filter_map(|(id, json)| decode_session(id, json))
            .filter(|session| !session.is_expired(now))
            .collect();
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    async fn stats(&self) -> AppResult<SessionStats> {
        let now = Utc::now();
        let payloads = self.scan_session_payloads().await?;

        let mut stats = SessionStats::default();
        for (key, json) in &payloads {
            let Some(session) = decode_session(key, json) else {
                continue;
            };
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
        let now = Utc::now();
        let payloads = self.scan_session_payloads().await?;

        let expired: Vec<(String, Session)> = payloads
            .iter()
            .filter_map(|(key, json)| decode_session(key, json).map(|s| (key.clone(), s)))
            .filter(|(_, session)| session.is_expired(now))
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let mut conn = self.manager.clone();
        self.run("cleanup_expired", async move {
            let mut removed = 0u64;
            for (key, session) in expired {
                // The native TTL may beat us to it; only count real removals.
                let count: u64 = conn.del(&key).await?;
                removed += count;
                conn.srem::<_, _, ()>(
                    user_index_key(session.user_id),
                    &session.session_id,
                )
                .await?;
            }
            Ok(removed)
        })
        .await
    }
}

/// Revoked token ids, each held under `blacklist:{jti}` for exactly as long
/// as the token itself would have lived.
pub struct RedisTokenBlacklist {
    manager: ConnectionManager,
    op_timeout: Duration,
}

impl RedisTokenBlacklist {
    pub fn new(manager: ConnectionManager, config: &StoreConfig) -> Self {
        Self {
            manager,
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        }
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::from(e)),
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "token blacklist operation timed out"
                );
                Err(AppError::store_unavailable("session-store"))
            }
        }
    }
}

#[async_trait]
impl TokenBlacklist for RedisTokenBlacklist {
    async fn add(&self, jti: Uuid, expires_at: DateTime<Utc>) -> AppResult<()> {
        let ttl_ms = (expires_at - Utc::now()).num_milliseconds();
        if ttl_ms <= 0 {
            // The signature check already rejects a token past its exp.
            return Ok(());
        }
        let key = blacklist_key(jti);
        let mut conn = self.manager.clone();
        self.run("blacklist_add", async move {
            conn.pset_ex::<_, _, ()>(&key, 1u8, ttl_ms as u64).await?;
            Ok(())
        })
        .await
    }

    async fn contains(&self, jti: Uuid) -> AppResult<bool> {
        let key = blacklist_key(jti);
        let mut conn = self.manager.clone();
        self.run("blacklist_contains", async move { conn.exists(&key).await })
            .await
    }
}
