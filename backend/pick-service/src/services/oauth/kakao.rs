use super::{OAuthError, OAuthProvider, OAuthUserInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct KakaoOAuthProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http_client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
struct KakaoTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct KakaoUserInfo {
    id: i64,
    kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Deserialize)]
struct KakaoAccount {
    email: Option<String>,
    profile: Option<KakaoProfile>,
}

#[derive(Debug, Deserialize)]
struct KakaoProfile {
    nickname: Option<String>,
}

impl KakaoOAuthProvider {
    pub fn from_env() -> Result<Self, OAuthError> {
        let client_id = std::env::var("KAKAO_CLIENT_ID")
            .map_err(|_| OAuthError::ConfigError("KAKAO_CLIENT_ID not set".to_string()))?;
        let client_secret = std::env::var("KAKAO_CLIENT_SECRET")
            .map_err(|_| OAuthError::ConfigError("KAKAO_CLIENT_SECRET not set".to_string()))?;
        let redirect_uri = std::env::var("KAKAO_REDIRECT_URI")
            .map_err(|_| OAuthError::ConfigError("KAKAO_REDIRECT_URI not set".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            http_client: Arc::new(Client::new()),
        })
    }
}

#[async_trait]
impl OAuthProvider for KakaoOAuthProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "https://kauth.kakao.com/oauth/authorize?client_id={}&redirect_uri={}&response_type=code&state={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthUserInfo, OAuthError> {
        let token_response = self
            .http_client
            .post("https://kauth.kakao.com/oauth/token")
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("HTTP error: {}", e)))?
            .json::<KakaoTokenResponse>()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("JSON parse error: {}", e)))?;

        let user_info = self
            .http_client
            .get("https://kapi.kakao.com/v2/user/me")
            .bearer_auth(&token_response.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFetch(format!("HTTP error: {}", e)))?
            .json::<KakaoUserInfo>()
            .await
            .map_err(|e| OAuthError::UserInfoFetch(format!("JSON parse error: {}", e)))?;

        let account = user_info.kakao_account;
        let (email, nickname) = match account {
            Some(account) => (
                account.email,
                account.profile.and_then(|p| p.nickname),
            ),
            None => (None, None),
        };

        Ok(OAuthUserInfo {
            provider: "kakao".to_string(),
            provider_user_id: user_info.id.to_string(),
            email,
            display_name: nickname,
        })
    }

    fn provider_name(&self) -> &str {
        "kakao"
    }
}
