/// Follow repository - directed follow edges between users
use sqlx::PgPool;

use crate::error::Result;

/// A follow edge joined with the counterpart's nickname for display.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct FollowEntry {
    pub id: i64,
    pub user_id: String,
    pub nickname: String,
    pub followed_at: chrono::DateTime<chrono::Utc>,
}

/// Idempotent create; returns true if a new edge was inserted.
///
/// Self-follow is rejected upstream and additionally blocked by the table's
/// CHECK constraint; the unique constraint makes the insert idempotent.
pub async fn follow(pool: &PgPool, from_user: &str, to_user: &str) -> Result<bool> {
    let inserted = sqlx::query_as::<_, (i64,)>(
        r#"
        INSERT INTO follows (from_user, to_user, created_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (from_user, to_user) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(from_user)
    .bind(to_user)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

/// Idempotent delete; returns true if an edge was removed.
pub async fn unfollow(pool: &PgPool, from_user: &str, to_user: &str) -> Result<bool> {
    let affected = sqlx::query(
        r#"
        DELETE FROM follows
        WHERE from_user = $1 AND to_user = $2
        "#,
    )
    .bind(from_user)
    .bind(to_user)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Check if `from_user` follows `to_user`.
pub async fn is_following(pool: &PgPool, from_user: &str, to_user: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE from_user = $1 AND to_user = $2)",
    )
    .bind(from_user)
    .bind(to_user)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Paginated followers of `user_id`, newest first.
pub async fn list_followers(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<FollowEntry>> {
    let entries = sqlx::query_as::<_, FollowEntry>(
        r#"
        SELECT f.id, f.from_user AS user_id, u.nickname, f.created_at AS followed_at
        FROM follows f
        JOIN users u ON u.user_id = f.from_user
        WHERE f.to_user = $1
        ORDER BY f.created_at DESC, f.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Paginated list of users `user_id` follows, newest first.
pub async fn list_following(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<FollowEntry>> {
    let entries = sqlx::query_as::<_, FollowEntry>(
        r#"
        SELECT f.id, f.to_user AS user_id, u.nickname, f.created_at AS followed_at
        FROM follows f
        JOIN users u ON u.user_id = f.to_user
        WHERE f.from_user = $1
        ORDER BY f.created_at DESC, f.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

pub async fn follower_count(pool: &PgPool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE to_user = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn following_count(pool: &PgPool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE from_user = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
