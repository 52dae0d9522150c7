//! Database-backed flows: ownership rules, pick casting, popularity order.
//!
//! These tests need a live Postgres. Point DATABASE_URL at a disposable
//! database and run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;

use pick_service::db::{comment_repo, create_pool, pick_repo, run_migrations, user_repo, vote_repo};
use pick_service::models::{Category, DisplayRange};
use pick_service::services::ensure_owner;
use pick_service::AppError;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = create_pool(&url, 5).await.expect("connect to postgres");
    run_migrations(&pool).await.expect("apply migrations");
    pool
}

fn unique(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}_{}", prefix, suffix.to_lowercase())
}

async fn seed_user(pool: &PgPool, prefix: &str) -> String {
    let user_id = unique(prefix);
    user_repo::create_user(
        pool,
        &user_id,
        "not-a-real-hash",
        &format!("{}@example.com", user_id),
        prefix,
        None,
        None,
    )
    .await
    .expect("create user");
    user_id
}

async fn seed_vote(pool: &PgPool, owner: &str, title: &str) -> (i64, Vec<i64>) {
    let (vote, options) = vote_repo::create_with_options(
        pool,
        owner,
        title,
        "content",
        Category::Etc,
        DisplayRange::Public,
        false,
        Utc::now() + Duration::days(3),
        &["yes".to_string(), "no".to_string()],
    )
    .await
    .expect("create vote");
    (vote.id, options.into_iter().map(|o| o.id).collect())
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn comment_mutations_enforce_ownership() {
    let pool = test_pool().await;
    let bob = seed_user(&pool, "bob").await;
    let carol = seed_user(&pool, "carol").await;
    let (vote_id, _) = seed_vote(&pool, &bob, "ownership").await;

    let comment = comment_repo::create_comment(&pool, vote_id, &bob, "original")
        .await
        .expect("create comment");

    // Non-author update: rejected before any write, content untouched
    let loaded = comment_repo::get_by_id(&pool, comment.id).await.unwrap();
    let denial = ensure_owner(&loaded.user_id, &carol, "comment").unwrap_err();
    assert!(matches!(denial, AppError::OwnershipMismatch(_)));
    let unchanged = comment_repo::get_by_id(&pool, comment.id).await.unwrap();
    assert_eq!(unchanged.content, "original");

    // Author update replaces content only
    ensure_owner(&loaded.user_id, &bob, "comment").unwrap();
    let updated = comment_repo::update_content(&pool, comment.id, "edited")
        .await
        .unwrap();
    assert_eq!(updated.content, "edited");
    assert_eq!(updated.user_id, bob);
    assert_eq!(updated.created_at, comment.created_at);

    // Author delete removes the row
    assert!(comment_repo::delete_comment(&pool, comment.id).await.unwrap());
    assert!(comment_repo::find_by_id(&pool, comment.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn single_pick_votes_keep_one_pick_per_user() {
    let pool = test_pool().await;
    let bob = seed_user(&pool, "bob").await;
    let dave = seed_user(&pool, "dave").await;
    let (vote_id, option_ids) = seed_vote(&pool, &bob, "single pick").await;
    let vote = vote_repo::get_by_id(&pool, vote_id).await.unwrap();

    pick_repo::cast_picks(&pool, &vote, &dave, &[option_ids[0]])
        .await
        .unwrap();
    // Re-casting on the other option replaces the first pick
    pick_repo::cast_picks(&pool, &vote, &dave, &[option_ids[1]])
        .await
        .unwrap();

    let picked = pick_repo::picked_option_ids(&pool, vote_id, &dave).await.unwrap();
    assert_eq!(picked, vec![option_ids[1]]);

    // Two options at once are rejected on a single-pick vote
    let err = pick_repo::cast_picks(&pool, &vote, &dave, &option_ids)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn popular_listing_orders_by_descending_pick_count() {
    let pool = test_pool().await;
    let bob = seed_user(&pool, "bob").await;
    let dave = seed_user(&pool, "dave").await;
    let erin = seed_user(&pool, "erin").await;

    let (hot_id, hot_options) = seed_vote(&pool, &bob, "hot").await;
    let (warm_id, warm_options) = seed_vote(&pool, &bob, "warm").await;
    let (cold_a_id, _) = seed_vote(&pool, &bob, "cold a").await;
    let (cold_b_id, _) = seed_vote(&pool, &bob, "cold b").await;

    let hot = vote_repo::get_by_id(&pool, hot_id).await.unwrap();
    let warm = vote_repo::get_by_id(&pool, warm_id).await.unwrap();
    pick_repo::cast_picks(&pool, &hot, &dave, &[hot_options[0]]).await.unwrap();
    pick_repo::cast_picks(&pool, &hot, &erin, &[hot_options[1]]).await.unwrap();
    pick_repo::cast_picks(&pool, &warm, &dave, &[warm_options[0]]).await.unwrap();

    let ranked = vote_repo::list_popular(&pool, &bob, Some(Category::Etc), 100, 0)
        .await
        .unwrap();
    let ids: Vec<i64> = ranked.iter().map(|v| v.id).collect();

    let pos = |id: i64| ids.iter().position(|&x| x == id).expect("vote in listing");
    assert!(pos(hot_id) < pos(warm_id));
    assert!(pos(warm_id) < pos(cold_a_id));
    // Zero-pick ties break by ascending vote id
    assert!(pos(cold_a_id) < pos(cold_b_id));
}
