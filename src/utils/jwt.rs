use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::{Role, Session};
use crate::error::{AppError, AppResult};
use crate::utils::hash::hash_token;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: String,
    pub name: String,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub permissions: Vec<String>,
    pub exp: usize,
    pub iat: usize,
    pub jti: Uuid,
    pub kid: String,
    pub iss: String,
    pub aud: Vec<String>,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// Mints the signed bearer token for a session. Expiry honours the session's
/// remember flag; the claims are the snapshot frozen at login.
pub fn create_access_token(
    session: &Session,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> AppResult<(String, DateTime<Utc>)> {
    let lifetime = if session.remember {
        config.jwt_remember_expiration_seconds
    } else {
        config.jwt_expiration_seconds
    };
    let exp = now + Duration::seconds(lifetime as i64);

    let claims = Claims {
        sub: session.user_id,
        sid: session.session_id.clone(),
        name: session.claims.name.clone(),
        role: session.claims.role,
        institution_id: session.claims.institution_id,
        permissions: session.claims.permissions.clone(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        jti: Uuid::new_v4(),
        kid: config.jwt_kid.clone(),
        iss: config.issuer.clone(),
        aud: vec![config.audience.clone()],
    };

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(config.jwt_kid.clone());

    let token = encode(
        &header,
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(e.into()))?;

    Ok((token, exp))
}

pub fn validate_token(token: &str, config: &AuthConfig) -> AppResult<Claims> {
    let header = decode_header(token).map_err(|_| AppError::InvalidToken)?;
    let kid = header.kid.ok_or(AppError::InvalidToken)?;

    let secret = signing_secret_for_kid(config, &kid).ok_or(AppError::InvalidToken)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Mints an opaque refresh token for a session. The raw form handed to the
/// client is `{session_id}.{secret}`; only the secret's hash is kept, inside
/// the session record, so the token can never be looked up by value.
pub fn mint_refresh_token(session_id: &str) -> (String, String) {
    let secret = Uuid::new_v4().simple().to_string();
    let raw = format!("{session_id}.{secret}");
    let reference = hash_token(&secret);
    (raw, reference)
}

/// Splits a presented refresh token into its session id and secret.
pub fn split_refresh_token(raw: &str) -> AppResult<(&str, &str)> {
    match raw.split_once('.') {
        Some((session_id, secret)) if !session_id.is_empty() && !secret.is_empty() => {
            Ok((session_id, secret))
        }
        _ => Err(AppError::InvalidToken),
    }
}

fn signing_secret_for_kid(config: &AuthConfig, kid: &str) -> Option<String> {
    if kid == config.jwt_kid {
        return Some(config.jwt_secret.clone());
    }

    config
        .previous_jwt_kids
        .iter()
        .position(|existing| existing == kid)
        .and_then(|idx| config.previous_jwt_secrets.get(idx).cloned())
}
