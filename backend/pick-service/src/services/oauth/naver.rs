use super::{OAuthError, OAuthProvider, OAuthUserInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct NaverOAuthProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http_client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
struct NaverTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct NaverUserInfoEnvelope {
    resultcode: String,
    response: Option<NaverUserInfo>,
}

#[derive(Debug, Deserialize)]
struct NaverUserInfo {
    id: String,
    email: Option<String>,
    nickname: Option<String>,
}

impl NaverOAuthProvider {
    pub fn from_env() -> Result<Self, OAuthError> {
        let client_id = std::env::var("NAVER_CLIENT_ID")
            .map_err(|_| OAuthError::ConfigError("NAVER_CLIENT_ID not set".to_string()))?;
        let client_secret = std::env::var("NAVER_CLIENT_SECRET")
            .map_err(|_| OAuthError::ConfigError("NAVER_CLIENT_SECRET not set".to_string()))?;
        let redirect_uri = std::env::var("NAVER_REDIRECT_URI")
            .map_err(|_| OAuthError::ConfigError("NAVER_REDIRECT_URI not set".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            http_client: Arc::new(Client::new()),
        })
    }
}

#[async_trait]
impl OAuthProvider for NaverOAuthProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "https://nid.naver.com/oauth2.0/authorize?response_type=code&client_id={}&redirect_uri={}&state={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<OAuthUserInfo, OAuthError> {
        let token_response = self
            .http_client
            .get("https://nid.naver.com/oauth2.0/token")
            .query(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("HTTP error: {}", e)))?
            .json::<NaverTokenResponse>()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("JSON parse error: {}", e)))?;

        let envelope = self
            .http_client
            .get("https://openapi.naver.com/v1/nid/me")
            .bearer_auth(&token_response.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFetch(format!("HTTP error: {}", e)))?
            .json::<NaverUserInfoEnvelope>()
            .await
            .map_err(|e| OAuthError::UserInfoFetch(format!("JSON parse error: {}", e)))?;

        if envelope.resultcode != "00" {
            return Err(OAuthError::UserInfoFetch(format!(
                "naver result code {}",
                envelope.resultcode
            )));
        }

        let user_info = envelope
            .response
            .ok_or_else(|| OAuthError::UserInfoFetch("empty naver response".to_string()))?;

        Ok(OAuthUserInfo {
            provider: "naver".to_string(),
            provider_user_id: user_info.id,
            email: user_info.email,
            display_name: user_info.nickname,
        })
    }

    fn provider_name(&self) -> &str {
        "naver"
    }
}
