use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod google;
pub mod kakao;
pub mod naver;

use crate::error::AppError;

/// Profile attributes handed back after a completed handshake. The
/// handshake itself happens at the provider; this service only exchanges
/// the code and reads the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    /// OAuth provider (kakao, naver, google)
    pub provider: String,
    /// Provider-specific user id
    pub provider_user_id: String,
    /// Email, when the provider shares it
    pub email: Option<String>,
    /// Display name from the provider profile
    pub display_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid authorization code: {0}")]
    InvalidAuthCode(String),

    #[error("Failed to exchange token: {0}")]
    TokenExchange(String),

    #[error("Failed to fetch user info: {0}")]
    UserInfoFetch(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::UnknownProvider(p) => AppError::BadRequest(format!("unknown provider: {}", p)),
            other => AppError::OAuth(other.to_string()),
        }
    }
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Authorization URL the client is redirected to.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the provider profile.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthUserInfo, OAuthError>;

    /// Provider name as it appears in routes and user ids.
    fn provider_name(&self) -> &str;
}

/// Factory for provider instances, keyed by name.
pub struct OAuthProviderFactory;

impl OAuthProviderFactory {
    pub fn create(provider: &str) -> Result<Box<dyn OAuthProvider>, OAuthError> {
        match provider.to_lowercase().as_str() {
            "kakao" => Ok(Box::new(kakao::KakaoOAuthProvider::from_env()?)),
            "naver" => Ok(Box::new(naver::NaverOAuthProvider::from_env()?)),
            "google" => Ok(Box::new(google::GoogleOAuthProvider::from_env()?)),
            other => Err(OAuthError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let result = OAuthProviderFactory::create("myspace");
        assert!(matches!(result, Err(OAuthError::UnknownProvider(_))));
    }
}
