use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::db::{follow_repo, user_repo};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::services::accounts::ProfileChanges;
use crate::services::AccountService;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 20))]
    pub nickname: Option<String>,

    #[validate(length(max = 200))]
    pub memo: Option<String>,

    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub user_id: String,
    pub nickname: String,
    pub memo: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub follower_count: i64,
    pub following_count: i64,
}

/// GET /api/v1/users/me
///
/// Resolves through the cache-aside path.
pub async fn get_me(
    user: UserId,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse> {
    let profile = accounts.resolve(&user.0).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PATCH /api/v1/users/me
pub async fn update_me(
    user: UserId,
    accounts: web::Data<AccountService>,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let changes = ProfileChanges {
        nickname: req.nickname.clone(),
        memo: req.memo.clone(),
        birthday: req.birthday,
    };

    let profile = accounts.update_profile(&user.0, changes).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/users/{id}
pub async fn get_user(pool: web::Data<PgPool>, path: web::Path<String>) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    let user = user_repo::find_by_user_id(pool.get_ref(), &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user not found: {}", user_id)))?;

    let (follower_count, following_count) = futures::try_join!(
        follow_repo::follower_count(pool.get_ref(), &user.user_id),
        follow_repo::following_count(pool.get_ref(), &user.user_id),
    )?;

    Ok(HttpResponse::Ok().json(PublicProfile {
        user_id: user.user_id,
        nickname: user.nickname,
        memo: user.memo,
        created_at: user.created_at,
        follower_count,
        following_count,
    }))
}
