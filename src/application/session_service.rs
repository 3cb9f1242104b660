use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::{ClaimsSnapshot, Session, SessionStats, VerifiedIdentity};
use crate::error::{AppError, AppResult};
use crate::infrastructure::credentials::CredentialVerifier;
use crate::infrastructure::store::{SessionStore, TokenBlacklist};
use crate::security::{ClientFingerprint, Clock, LoginThrottle};
use crate::utils::hash::hash_token;
use crate::utils::jwt::{
    create_access_token, mint_refresh_token, split_refresh_token, validate_token, Claims,
};

/// Coordinates the session lifecycle: login, validate, refresh, logout and
/// the admin operations, composing the throttle, the credential verifier,
/// the shared store and the token blacklist. Every mutation of session state
/// goes through here.
#[derive(Clone)]
pub struct SessionService {
    credentials: Arc<dyn CredentialVerifier>,
    sessions: Arc<dyn SessionStore>,
    blacklist: Arc<dyn TokenBlacklist>,
    throttle: Arc<LoginThrottle>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

/// Outcome of a successful login.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub session: Session,
    pub identity: VerifiedIdentity,
}

/// Outcome of a successful refresh: a fresh access token plus the rotated
/// refresh token that replaces the one just spent.
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub claims: Claims,
    pub session: Session,
}

/// A user's sessions along with which one the caller is speaking from.
#[derive(Debug, Clone)]
pub struct SessionOverview {
    pub sessions: Vec<Session>,
    pub current_session_id: String,
}

impl SessionService {
    pub fn new(
        credentials: Arc<dyn CredentialVerifier>,
        sessions: Arc<dyn SessionStore>,
        blacklist: Arc<dyn TokenBlacklist>,
        throttle: Arc<LoginThrottle>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            credentials,
            sessions,
            blacklist,
            throttle,
            clock,
            config,
        }
    }

    /// Establishes a new session. The throttle decision runs before any
    /// credential work so its counters advance whether or not the password
    /// turns out to be right.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
        fingerprint: &ClientFingerprint,
    ) -> AppResult<EstablishedSession> {
        let remaining = self.throttle.check(fingerprint)?;
        tracing::debug!(key = %fingerprint.key, remaining, "login attempt admitted");

        let identity = self.credentials.verify(email, password).await?;

        let now = self.clock.now();
        let session_lifetime = if remember {
            Duration::days(self.config.refresh_token_expiration_days as i64)
        } else {
            Duration::seconds(self.config.jwt_expiration_seconds as i64)
        };

        let session_id = Uuid::new_v4().simple().to_string();
        let (refresh_token, refresh_reference) = mint_refresh_token(&session_id);

        let session = Session {
            session_id,
            user_id: identity.user_id,
            device_type: fingerprint.device,
            created_at: now,
            last_activity_at: now,
            expires_at: now + session_lifetime,
            refresh_token_id: refresh_reference,
            remember,
            claims: ClaimsSnapshot {
                name: identity.name.clone(),
                role: identity.role,
                institution_id: identity.institution_id,
                permissions: identity.permissions.clone(),
            },
        };

        let (token, expires_at) = create_access_token(&session, &self.config, now)?;
        self.sessions.create(&session).await?;

        tracing::info!(
            user_id = %identity.user_id,
            session_id = %session.session_id,
            device = fingerprint.device.as_str(),
            remember,
            "session established"
        );

        Ok(EstablishedSession {
            token,
            refresh_token,
            expires_at,
            session,
            identity,
        })
    }

    /// Full validation: signature and expiry, then the blacklist, then the
    /// session record itself. Each check collapses to the same generic
    /// failure so a caller cannot probe which one rejected the token; only a
    /// store outage is reported distinctly, and it fails closed.
    pub async fn validate(&self, bearer: &str) -> AppResult<ValidatedSession> {
        let claims =
            validate_token(bearer, &self.config).map_err(|_| AppError::SessionInvalid)?;

        if self.blacklist.contains(claims.jti).await? {
            return Err(AppError::SessionInvalid);
        }

        let session = self
            .sessions
            .get(&claims.sid)
            .await?
            .ok_or(AppError::SessionInvalid)?;
        if session.is_expired(self.clock.now()) {
            return Err(AppError::SessionInvalid);
        }

        Ok(ValidatedSession { claims, session })
    }

    /// Spends a refresh token: rotates the secret, bumps the activity
    /// timestamp and mints a fresh access token. The session's expiry is
    /// never pushed out here, so a refresh chain still dies with its session.
    pub async fn refresh(&self, raw_refresh: &str) -> AppResult<RefreshedSession> {
        let (session_id, secret) = split_refresh_token(raw_refresh)?;

        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(AppError::SessionInvalid)?;
        let now = self.clock.now();
        if session.is_expired(now) {
            return Err(AppError::SessionInvalid);
        }

        // A rotated-out token no longer matches the recorded reference.
        if hash_token(secret) != session.refresh_token_id {
            return Err(AppError::InvalidToken);
        }

        let (refresh_token, refresh_reference) = mint_refresh_token(&session.session_id);
        session.refresh_token_id = refresh_reference;
        session.last_activity_at = now;

        let (token, expires_at) = create_access_token(&session, &self.config, now)?;
        self.sessions.update(&session).await?;

        tracing::debug!(session_id = %session.session_id, "refresh token rotated");

        Ok(RefreshedSession {
            token,
            refresh_token,
            expires_at,
        })
    }

    /// Ends the caller's own session. Only the signature and expiry are
    /// checked here, not the blacklist or the store, so logging out twice
    /// reports success both times. Returns whether a record was removed.
    pub async fn logout(&self, bearer: &str) -> AppResult<bool> {
        let claims = validate_token(bearer, &self.config)?;

        self.blacklist.add(claims.jti, claims.expires_at()).await?;
        let removed = self.sessions.delete(&claims.sid).await?;

        tracing::info!(
            user_id = %claims.sub,
            session_id = %claims.sid,
            removed,
            "session logged out"
        );
        Ok(removed)
    }

    /// Ends every session the caller owns and returns how many the store
    /// actually removed. Individual tokens are not blacklisted; once the
    /// records are gone, validation fails on the session lookup.
    pub async fn logout_all(&self, bearer: &str) -> AppResult<u64> {
        let claims = validate_token(bearer, &self.config)?;

        let removed = self.sessions.delete_all_for_user(claims.sub).await?;

        tracing::info!(user_id = %claims.sub, removed, "all sessions removed for user");
        Ok(removed)
    }

    pub async fn list_sessions(&self, bearer: &str) -> AppResult<SessionOverview> {
        let validated = self.validate(bearer).await?;
        let sessions = self.sessions.list_for_user(validated.claims.sub).await?;
        Ok(SessionOverview {
            sessions,
            current_session_id: validated.claims.sid,
        })
    }

    /// Removes one of the caller's other sessions. A session id belonging to
    /// someone else reads as not-found, never as forbidden.
    pub async fn destroy_session(&self, bearer: &str, session_id: &str) -> AppResult<()> {
        let validated = self.validate(bearer).await?;

        let target = self
            .sessions
            .get(session_id)
            .await?
            .filter(|session| session.user_id == validated.claims.sub)
            .ok_or_else(|| AppError::NotFound("session not found".to_string()))?;

        self.sessions.delete(&target.session_id).await?;
        tracing::info!(
            user_id = %validated.claims.sub,
            session_id,
            "session destroyed by owner"
        );
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<SessionStats> {
        self.sessions.stats().await
    }

    /// Removes expired records the store's passive TTL has not reaped yet.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let removed = self.sessions.cleanup_expired().await?;
        if removed > 0 {
            tracing::info!(removed, "expired sessions swept from the store");
        }
        Ok(removed)
    }
}
