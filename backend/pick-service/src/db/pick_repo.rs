/// Pick repository - casting picks on vote options
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::Vote;

/// Cast the given options for a user on a vote.
///
/// Single-pick votes accept exactly one option and casting replaces any
/// previous pick on the same vote inside the transaction. Multi-pick votes
/// accept each option once; re-casting an option is a no-op through the
/// unique constraint.
pub async fn cast_picks(
    pool: &PgPool,
    vote: &Vote,
    user_id: &str,
    option_ids: &[i64],
) -> Result<()> {
    if option_ids.is_empty() {
        return Err(AppError::BadRequest("no options selected".to_string()));
    }
    if !vote.is_multi_pick && option_ids.len() != 1 {
        return Err(AppError::BadRequest(
            "this vote accepts a single pick".to_string(),
        ));
    }

    let valid_ids = sqlx::query_scalar::<_, i64>("SELECT id FROM vote_options WHERE vote_id = $1")
        .bind(vote.id)
        .fetch_all(pool)
        .await?;
    for option_id in option_ids {
        if !valid_ids.contains(option_id) {
            return Err(AppError::BadRequest(format!(
                "option {} does not belong to vote {}",
                option_id, vote.id
            )));
        }
    }

    let mut tx = pool.begin().await?;

    if !vote.is_multi_pick {
        sqlx::query(
            r#"
            DELETE FROM picks
            WHERE user_id = $1
              AND vote_option_id IN (SELECT id FROM vote_options WHERE vote_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(vote.id)
        .execute(&mut *tx)
        .await?;
    }

    for option_id in option_ids {
        sqlx::query(
            r#"
            INSERT INTO picks (user_id, vote_option_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, vote_option_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(option_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Option ids the user has picked on a vote.
pub async fn picked_option_ids(pool: &PgPool, vote_id: i64, user_id: &str) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT p.vote_option_id
        FROM picks p
        JOIN vote_options vo ON vo.id = p.vote_option_id
        WHERE vo.vote_id = $1 AND p.user_id = $2
        ORDER BY p.vote_option_id
        "#,
    )
    .bind(vote_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
