/// User repository - database operations for user rows
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::User;

const USER_COLUMNS: &str =
    "user_id, password_hash, email, nickname, memo, birthday, created_at, updated_at";

/// Insert a new user row. A concurrent insert of the same user_id loses to
/// the primary key and surfaces as [`AppError::Duplicate`].
pub async fn create_user(
    pool: &PgPool,
    user_id: &str,
    password_hash: &str,
    email: &str,
    nickname: &str,
    memo: Option<&str>,
    birthday: Option<NaiveDate>,
) -> Result<User> {
    let now = Utc::now();

    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (user_id, password_hash, email, nickname, memo, birthday, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(password_hash)
    .bind(email.to_lowercase())
    .bind(nickname)
    .bind(memo)
    .bind(birthday)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if AppError::is_unique_violation(&e) {
            AppError::Duplicate(format!("user already exists: {}", user_id))
        } else {
            AppError::Database(e)
        }
    })
}

/// Find a user by its id (the login name).
pub async fn find_by_user_id(pool: &PgPool, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE user_id = $1
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Update the mutable profile fields. Identity and credentials are not
/// touched here.
pub async fn update_profile(
    pool: &PgPool,
    user_id: &str,
    nickname: Option<&str>,
    memo: Option<&str>,
    birthday: Option<NaiveDate>,
) -> Result<User> {
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET nickname = COALESCE($2, nickname),
            memo = COALESCE($3, memo),
            birthday = COALESCE($4, birthday),
            updated_at = $5
        WHERE user_id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(nickname)
    .bind(memo)
    .bind(birthday)
    .bind(now)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("user not found: {}", user_id)))?;

    Ok(user)
}

/// Check whether a user id is already taken.
pub async fn user_exists(pool: &PgPool, user_id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
