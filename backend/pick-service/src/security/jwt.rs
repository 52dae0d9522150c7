/// JWT token generation and validation (HS256)
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::{AppError, Result};

const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 1;
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
    /// Display nickname
    pub nickname: String,
}

/// Token pair handed out on login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

// Keys loaded from configuration during startup
lazy_static! {
    static ref JWT_KEYS: RwLock<Option<(EncodingKey, DecodingKey)>> = RwLock::new(None);
}

/// Initialize the signing keys from the configured secret.
/// Must be called during application startup before any JWT operations.
pub fn initialize_keys(secret: &str) -> Result<()> {
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut keys = JWT_KEYS
        .write()
        .map_err(|e| AppError::Internal(format!("Failed to lock JWT keys: {}", e)))?;
    *keys = Some((encoding_key, decoding_key));

    Ok(())
}

fn get_encoding_key() -> Result<EncodingKey> {
    let keys = JWT_KEYS
        .read()
        .map_err(|e| AppError::Internal(format!("Failed to lock JWT keys: {}", e)))?;

    keys.as_ref().map(|(enc, _)| enc.clone()).ok_or_else(|| {
        AppError::Internal("JWT keys not initialized, call initialize_keys() at startup".into())
    })
}

fn get_decoding_key() -> Result<DecodingKey> {
    let keys = JWT_KEYS
        .read()
        .map_err(|e| AppError::Internal(format!("Failed to lock JWT keys: {}", e)))?;

    keys.as_ref().map(|(_, dec)| dec.clone()).ok_or_else(|| {
        AppError::Internal("JWT keys not initialized, call initialize_keys() at startup".into())
    })
}

fn generate_token(user_id: &str, nickname: &str, token_type: &str, ttl: Duration) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        token_type: token_type.to_string(),
        nickname: nickname.to_string(),
    };

    let encoding_key = get_encoding_key()?;
    let token = encode(&Header::default(), &claims, &encoding_key)?;
    Ok(token)
}

pub fn generate_access_token(user_id: &str, nickname: &str) -> Result<String> {
    generate_token(
        user_id,
        nickname,
        "access",
        Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS),
    )
}

pub fn generate_refresh_token(user_id: &str, nickname: &str) -> Result<String> {
    generate_token(
        user_id,
        nickname,
        "refresh",
        Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
    )
}

/// Mint the access/refresh pair for a user.
pub fn issue_token_pair(user_id: &str, nickname: &str) -> Result<TokenResponse> {
    Ok(TokenResponse {
        access_token: generate_access_token(user_id, nickname)?,
        refresh_token: generate_refresh_token(user_id, nickname)?,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_EXPIRY_HOURS * 3600,
    })
}

/// Validate a token's signature and expiry.
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let decoding_key = get_decoding_key()?;
    let data = decode::<Claims>(token, &decoding_key, &Validation::default())?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        initialize_keys("test-secret-at-least-32-bytes-long!").unwrap();
    }

    #[test]
    fn access_token_round_trips_the_subject() {
        init();
        let token = generate_access_token("alice", "A").unwrap();
        let data = validate_token(&token).unwrap();
        assert_eq!(data.claims.sub, "alice");
        assert_eq!(data.claims.token_type, "access");
        assert_eq!(data.claims.nickname, "A");
    }

    #[test]
    fn refresh_token_is_distinguished_by_type() {
        init();
        let pair = issue_token_pair("bob", "B").unwrap();
        let refresh = validate_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.claims.token_type, "refresh");
        let access = validate_token(&pair.access_token).unwrap();
        assert_eq!(access.claims.token_type, "access");
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        init();
        assert!(validate_token("not.a.token").is_err());
    }
}
