/// Comment repository - vote comments and their likes
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::VoteComment;

/// Comment row joined with its author nickname and like count.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct CommentEntry {
    pub id: i64,
    pub vote_id: i64,
    pub user_id: String,
    pub nickname: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_comment(
    pool: &PgPool,
    vote_id: i64,
    user_id: &str,
    content: &str,
) -> Result<VoteComment> {
    let comment = sqlx::query_as::<_, VoteComment>(
        r#"
        INSERT INTO vote_comments (vote_id, user_id, content, created_at, updated_at)
        VALUES ($1, $2, $3, NOW(), NOW())
        RETURNING id, vote_id, user_id, content, created_at, updated_at
        "#,
    )
    .bind(vote_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    Ok(comment)
}

pub async fn find_by_id(pool: &PgPool, comment_id: i64) -> Result<Option<VoteComment>> {
    let comment = sqlx::query_as::<_, VoteComment>(
        r#"
        SELECT id, vote_id, user_id, content, created_at, updated_at
        FROM vote_comments
        WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;

    Ok(comment)
}

/// Load a comment or fail with NotFound.
pub async fn get_by_id(pool: &PgPool, comment_id: i64) -> Result<VoteComment> {
    find_by_id(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("comment not found: {}", comment_id)))
}

/// Comments of a vote, oldest first, with author nickname and like count.
pub async fn list_by_vote(
    pool: &PgPool,
    vote_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<CommentEntry>> {
    let comments = sqlx::query_as::<_, CommentEntry>(
        r#"
        SELECT c.id, c.vote_id, c.user_id, u.nickname, c.content,
               COUNT(cl.id) AS like_count, c.created_at, c.updated_at
        FROM vote_comments c
        JOIN users u ON u.user_id = c.user_id
        LEFT JOIN comment_likes cl ON cl.comment_id = c.id
        WHERE c.vote_id = $1
        GROUP BY c.id, u.nickname
        ORDER BY c.created_at ASC, c.id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(vote_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Replace the content only; author and created_at stay untouched.
pub async fn update_content(pool: &PgPool, comment_id: i64, content: &str) -> Result<VoteComment> {
    let comment = sqlx::query_as::<_, VoteComment>(
        r#"
        UPDATE vote_comments
        SET content = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, vote_id, user_id, content, created_at, updated_at
        "#,
    )
    .bind(comment_id)
    .bind(content)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("comment not found: {}", comment_id)))?;

    Ok(comment)
}

/// Delete the row; likes cascade through the schema.
pub async fn delete_comment(pool: &PgPool, comment_id: i64) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM vote_comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Idempotent like; returns true if a new like was recorded.
pub async fn like_comment(pool: &PgPool, comment_id: i64, user_id: &str) -> Result<bool> {
    let inserted = sqlx::query_as::<_, (i64,)>(
        r#"
        INSERT INTO comment_likes (comment_id, user_id, created_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (comment_id, user_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

/// Idempotent unlike; returns true if a like was removed.
pub async fn unlike_comment(pool: &PgPool, comment_id: i64, user_id: &str) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
        .bind(comment_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}
