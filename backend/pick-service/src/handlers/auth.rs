use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use redis_utils::SharedConnectionManager;

use crate::cache::oauth_state;
use crate::error::{AppError, Result};
use crate::security::{jwt, password};
use crate::services::accounts::NewUser;
use crate::services::oauth::OAuthProviderFactory;
use crate::services::AccountService;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 20))]
    pub user_id: String,

    #[validate(length(min = 8, max = 72))]
    pub password: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 20))]
    pub nickname: String,

    #[validate(length(max = 200))]
    pub memo: Option<String>,

    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub user_id: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub code: String,
    pub state: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub authorization_url: String,
    pub state: String,
}

/// POST /api/v1/auth/register
pub async fn register(
    accounts: web::Data<AccountService>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let candidate = NewUser {
        user_id: req.user_id.clone(),
        password_hash: password::hash_password(&req.password)?,
        email: req.email.clone(),
        nickname: req.nickname.clone(),
        memo: req.memo.clone(),
        birthday: req.birthday,
    };

    let profile = accounts.register(candidate).await?;
    Ok(HttpResponse::Created().json(profile))
}

/// POST /api/v1/auth/login
pub async fn login(
    accounts: web::Data<AccountService>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let profile = accounts.authenticate(&req.user_id, &req.password).await?;
    let tokens = jwt::issue_token_pair(&profile.user_id, &profile.nickname)?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/v1/auth/refresh
pub async fn refresh_token(req: web::Json<RefreshRequest>) -> Result<HttpResponse> {
    let data = jwt::validate_token(&req.refresh_token)?;
    if data.claims.token_type != "refresh" {
        return Err(AppError::Authentication("refresh token required".into()));
    }

    let tokens = jwt::issue_token_pair(&data.claims.sub, &data.claims.nickname)?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// GET /api/v1/auth/oauth/{provider}/authorize
///
/// Hands the client the provider redirect URL together with a one-time
/// state the callback must return.
pub async fn oauth_authorize(
    redis: web::Data<SharedConnectionManager>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let provider = OAuthProviderFactory::create(&path.into_inner())?;

    let state: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    oauth_state::store_state(redis.get_ref(), &state, provider.provider_name())
        .await
        .map_err(|e| AppError::Internal(format!("oauth state store unavailable: {}", e)))?;

    Ok(HttpResponse::Ok().json(AuthorizeResponse {
        authorization_url: provider.authorization_url(&state),
        state,
    }))
}

/// POST /api/v1/auth/oauth/{provider}/callback
pub async fn oauth_callback(
    accounts: web::Data<AccountService>,
    redis: web::Data<SharedConnectionManager>,
    path: web::Path<String>,
    req: web::Json<OAuthCallbackRequest>,
) -> Result<HttpResponse> {
    let provider = OAuthProviderFactory::create(&path.into_inner())?;

    let issued_for = oauth_state::consume_state(redis.get_ref(), &req.state)
        .await
        .map_err(|e| AppError::Internal(format!("oauth state store unavailable: {}", e)))?
        .ok_or_else(|| AppError::BadRequest("invalid or expired oauth state".into()))?;
    if issued_for != provider.provider_name() {
        return Err(AppError::BadRequest(
            "oauth state was issued for another provider".into(),
        ));
    }

    let info = provider.exchange_code(&req.code, &req.redirect_uri).await?;
    let profile = accounts.find_or_create_oauth(&info).await?;
    let tokens = jwt::issue_token_pair(&profile.user_id, &profile.nickname)?;

    Ok(HttpResponse::Ok().json(tokens))
}
