use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::{comment_repo, vote_repo};
use crate::error::{AppError, Result};
use crate::handlers::PageQuery;
use crate::middleware::UserId;
use crate::services::{ensure_owner, AccountService};

const MAX_COMMENT_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub vote_id: i64,
    pub user_id: String,
    pub nickname: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<comment_repo::CommentEntry>,
    pub limit: i64,
    pub offset: i64,
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("comment content cannot be empty".into()));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "comment content exceeds maximum length of {}",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(())
}

/// POST /api/v1/votes/{id}/comments
pub async fn create_comment(
    actor: UserId,
    pool: web::Data<PgPool>,
    accounts: web::Data<AccountService>,
    path: web::Path<i64>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    validate_content(&req.content)?;

    // The vote must exist and be visible before the comment row is written
    let vote = vote_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    super::votes::ensure_visible(pool.get_ref(), &vote, &actor.0).await?;

    let comment = comment_repo::create_comment(pool.get_ref(), vote.id, &actor.0, &req.content)
        .await?;
    let author = accounts.resolve(&actor.0).await?;

    Ok(HttpResponse::Created().json(CommentResponse {
        id: comment.id,
        vote_id: comment.vote_id,
        user_id: comment.user_id,
        nickname: author.nickname,
        content: comment.content,
        like_count: 0,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }))
}

/// GET /api/v1/votes/{id}/comments
pub async fn list_comments(
    viewer: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let (limit, offset) = query.clamp();

    let vote = vote_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    super::votes::ensure_visible(pool.get_ref(), &vote, &viewer.0).await?;
    let comments = comment_repo::list_by_vote(pool.get_ref(), vote.id, limit, offset).await?;

    Ok(HttpResponse::Ok().json(CommentListResponse {
        comments,
        limit,
        offset,
    }))
}

/// PATCH /api/v1/comments/{id} - author only, content only
pub async fn update_comment(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    req: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse> {
    validate_content(&req.content)?;

    let comment = comment_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(&comment.user_id, &actor.0, "comment")?;

    let updated = comment_repo::update_content(pool.get_ref(), comment.id, &req.content).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/v1/comments/{id} - author only
pub async fn delete_comment(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let comment = comment_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(&comment.user_id, &actor.0, "comment")?;

    comment_repo::delete_comment(pool.get_ref(), comment.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/comments/{id}/like
pub async fn like_comment(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let comment = comment_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    comment_repo::like_comment(pool.get_ref(), comment.id, &actor.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/v1/comments/{id}/like
pub async fn unlike_comment(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let comment = comment_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    comment_repo::unlike_comment(pool.get_ref(), comment.id, &actor.0).await?;
    Ok(HttpResponse::NoContent().finish())
}
