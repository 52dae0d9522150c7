/// Vote repository - votes, their options, and the ranking/search queries
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::{Category, DisplayRange, Vote, VoteOption};

/// Option row joined with its pick count.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct OptionWithCount {
    pub id: i64,
    pub vote_id: i64,
    pub content: String,
    pub pick_count: i64,
}

/// What a vote search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    Title,
    Content,
    Nickname,
}

// Visibility rule shared by every listing query: public votes, the viewer's
// own votes, and follower-ranged votes of users the viewer follows.
const VISIBLE_TO_VIEWER: &str = r#"
    (v.display_range = 'public'
     OR v.user_id = $1
     OR (v.display_range = 'follower' AND EXISTS (
            SELECT 1 FROM follows f
            WHERE f.from_user = $1 AND f.to_user = v.user_id)))
"#;

const VOTE_COLUMNS: &str =
    "v.id, v.user_id, v.title, v.content, v.category, v.display_range, v.is_multi_pick, v.created_at, v.expired_at";

/// Create a vote and its options in one transaction.
pub async fn create_with_options(
    pool: &PgPool,
    user_id: &str,
    title: &str,
    content: &str,
    category: Category,
    display_range: DisplayRange,
    is_multi_pick: bool,
    expired_at: DateTime<Utc>,
    options: &[String],
) -> Result<(Vote, Vec<VoteOption>)> {
    let mut tx = pool.begin().await?;

    let vote = sqlx::query_as::<_, Vote>(
        r#"
        INSERT INTO votes (user_id, title, content, category, display_range, is_multi_pick, created_at, expired_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7)
        RETURNING id, user_id, title, content, category, display_range, is_multi_pick, created_at, expired_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(content)
    .bind(category)
    .bind(display_range)
    .bind(is_multi_pick)
    .bind(expired_at)
    .fetch_one(&mut *tx)
    .await?;

    let mut created = Vec::with_capacity(options.len());
    for option_content in options {
        let option = sqlx::query_as::<_, VoteOption>(
            r#"
            INSERT INTO vote_options (vote_id, content)
            VALUES ($1, $2)
            RETURNING id, vote_id, content
            "#,
        )
        .bind(vote.id)
        .bind(option_content)
        .fetch_one(&mut *tx)
        .await?;
        created.push(option);
    }

    tx.commit().await?;

    Ok((vote, created))
}

pub async fn find_by_id(pool: &PgPool, vote_id: i64) -> Result<Option<Vote>> {
    let vote = sqlx::query_as::<_, Vote>(&format!(
        r#"
        SELECT {VOTE_COLUMNS}
        FROM votes v
        WHERE v.id = $1
        "#
    ))
    .bind(vote_id)
    .fetch_optional(pool)
    .await?;

    Ok(vote)
}

/// Load a vote or fail with NotFound.
pub async fn get_by_id(pool: &PgPool, vote_id: i64) -> Result<Vote> {
    find_by_id(pool, vote_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("vote not found: {}", vote_id)))
}

/// Update the owner-editable fields. Ownership is verified by the caller
/// before this runs.
pub async fn update_vote(
    pool: &PgPool,
    vote_id: i64,
    title: Option<&str>,
    content: Option<&str>,
    category: Option<Category>,
    display_range: Option<DisplayRange>,
) -> Result<Vote> {
    let vote = sqlx::query_as::<_, Vote>(
        r#"
        UPDATE votes
        SET title = COALESCE($2, title),
            content = COALESCE($3, content),
            category = COALESCE($4, category),
            display_range = COALESCE($5, display_range)
        WHERE id = $1
        RETURNING id, user_id, title, content, category, display_range, is_multi_pick, created_at, expired_at
        "#,
    )
    .bind(vote_id)
    .bind(title)
    .bind(content)
    .bind(category)
    .bind(display_range)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("vote not found: {}", vote_id)))?;

    Ok(vote)
}

/// Delete a vote owned by `user_id`; options, picks, comments and likes go
/// with it through the schema's cascades. Returns true if a row was removed.
pub async fn delete_by_id_and_user(pool: &PgPool, vote_id: i64, user_id: &str) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM votes WHERE id = $1 AND user_id = $2")
        .bind(vote_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Timeline: newest first, optional category filter, visibility enforced.
pub async fn list_latest(
    pool: &PgPool,
    viewer: &str,
    category: Option<Category>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Vote>> {
    let votes = sqlx::query_as::<_, Vote>(&format!(
        r#"
        SELECT {VOTE_COLUMNS}
        FROM votes v
        WHERE ($2::vote_category IS NULL OR v.category = $2)
          AND {VISIBLE_TO_VIEWER}
        ORDER BY v.created_at DESC, v.id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(viewer)
    .bind(category)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(votes)
}

/// Popularity ranking: descending total pick count over the vote's options,
/// ties broken by ascending vote id so pagination stays reproducible.
pub async fn list_popular(
    pool: &PgPool,
    viewer: &str,
    category: Option<Category>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Vote>> {
    let votes = sqlx::query_as::<_, Vote>(&format!(
        r#"
        SELECT {VOTE_COLUMNS}
        FROM votes v
        LEFT JOIN vote_options vo ON vo.vote_id = v.id
        LEFT JOIN picks p ON p.vote_option_id = vo.id
        WHERE ($2::vote_category IS NULL OR v.category = $2)
          AND {VISIBLE_TO_VIEWER}
        GROUP BY v.id
        ORDER BY COUNT(p.id) DESC, v.id ASC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(viewer)
    .bind(category)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(votes)
}

/// Substring search over title, content, or author nickname.
pub async fn search(
    pool: &PgPool,
    viewer: &str,
    target: SearchTarget,
    keyword: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Vote>> {
    let predicate = match target {
        SearchTarget::Title => "v.title ILIKE '%' || $2 || '%'",
        SearchTarget::Content => "v.content ILIKE '%' || $2 || '%'",
        SearchTarget::Nickname => "u.nickname ILIKE '%' || $2 || '%'",
    };

    let votes = sqlx::query_as::<_, Vote>(&format!(
        r#"
        SELECT {VOTE_COLUMNS}
        FROM votes v
        JOIN users u ON u.user_id = v.user_id
        WHERE {predicate}
          AND {VISIBLE_TO_VIEWER}
        ORDER BY v.created_at DESC, v.id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(viewer)
    .bind(keyword)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(votes)
}

/// Options of a vote with their pick counts, stable option-id order.
pub async fn options_with_counts(pool: &PgPool, vote_id: i64) -> Result<Vec<OptionWithCount>> {
    let options = sqlx::query_as::<_, OptionWithCount>(
        r#"
        SELECT vo.id, vo.vote_id, vo.content, COUNT(p.id) AS pick_count
        FROM vote_options vo
        LEFT JOIN picks p ON p.vote_option_id = vo.id
        WHERE vo.vote_id = $1
        GROUP BY vo.id
        ORDER BY vo.id ASC
        "#,
    )
    .bind(vote_id)
    .fetch_all(pool)
    .await?;

    Ok(options)
}
