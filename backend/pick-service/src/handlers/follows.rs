use actix_web::{web, HttpResponse};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::{follow_repo, user_repo};
use crate::error::{AppError, Result};
use crate::handlers::PageQuery;
use crate::middleware::UserId;

#[derive(Debug, Serialize)]
pub struct FollowListResponse {
    pub users: Vec<follow_repo::FollowEntry>,
    pub limit: i64,
    pub offset: i64,
}

async fn ensure_user_exists(pool: &PgPool, user_id: &str) -> Result<()> {
    if !user_repo::user_exists(pool, user_id).await? {
        return Err(AppError::NotFound(format!("user not found: {}", user_id)));
    }
    Ok(())
}

/// POST /api/v1/users/{id}/follow
pub async fn follow_user(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let to_user = path.into_inner();

    if actor.0 == to_user {
        return Err(AppError::BadRequest("cannot follow yourself".into()));
    }
    ensure_user_exists(pool.get_ref(), &to_user).await?;

    let inserted = follow_repo::follow(pool.get_ref(), &actor.0, &to_user).await?;
    if !inserted {
        tracing::debug!("follow edge already exists: {} -> {}", actor.0, to_user);
    }

    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/v1/users/{id}/follow
pub async fn unfollow_user(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let to_user = path.into_inner();
    follow_repo::unfollow(pool.get_ref(), &actor.0, &to_user).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/users/{id}/followers
pub async fn get_followers(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let (limit, offset) = query.clamp();

    ensure_user_exists(pool.get_ref(), &user_id).await?;
    let users = follow_repo::list_followers(pool.get_ref(), &user_id, limit, offset).await?;

    Ok(HttpResponse::Ok().json(FollowListResponse {
        users,
        limit,
        offset,
    }))
}

/// GET /api/v1/users/{id}/following
pub async fn get_following(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let (limit, offset) = query.clamp();

    ensure_user_exists(pool.get_ref(), &user_id).await?;
    let users = follow_repo::list_following(pool.get_ref(), &user_id, limit, offset).await?;

    Ok(HttpResponse::Ok().json(FollowListResponse {
        users,
        limit,
        offset,
    }))
}
