use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::db::vote_repo::{OptionWithCount, SearchTarget};
use crate::db::{follow_repo, pick_repo, vote_repo};
use crate::error::{AppError, Result};
use crate::handlers::PageQuery;
use crate::middleware::UserId;
use crate::models::{Category, DisplayRange, Vote};
use crate::services::ensure_owner;

const MAX_OPTIONS: usize = 10;
const MIN_OPTIONS: usize = 2;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVoteRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(min = 1, max = 2000))]
    pub content: String,

    pub category: Category,

    pub display_range: Option<DisplayRange>,

    pub is_multi_pick: Option<bool>,

    pub expired_at: DateTime<Utc>,

    pub options: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVoteRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 2000))]
    pub content: Option<String>,

    pub category: Option<Category>,

    pub display_range: Option<DisplayRange>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub category: Option<Category>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub target: SearchTarget,
    pub keyword: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CastPicksRequest {
    pub option_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct VoteDetailResponse {
    #[serde(flatten)]
    pub vote: Vote,
    pub options: Vec<OptionWithCount>,
    pub total_picks: i64,
    pub my_picks: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct VoteListResponse {
    pub votes: Vec<Vote>,
    pub limit: i64,
    pub offset: i64,
}

/// Display-range gate for read paths. Invisible votes answer NotFound so
/// their existence is not leaked.
pub(crate) async fn ensure_visible(pool: &PgPool, vote: &Vote, viewer: &str) -> Result<()> {
    if vote.user_id == viewer {
        return Ok(());
    }
    match vote.display_range {
        DisplayRange::Public => Ok(()),
        DisplayRange::Follower => {
            if follow_repo::is_following(pool, viewer, &vote.user_id).await? {
                Ok(())
            } else {
                Err(AppError::NotFound(format!("vote not found: {}", vote.id)))
            }
        }
        DisplayRange::Private => Err(AppError::NotFound(format!("vote not found: {}", vote.id))),
    }
}

/// POST /api/v1/votes
pub async fn create_vote(
    actor: UserId,
    pool: web::Data<PgPool>,
    req: web::Json<CreateVoteRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    if req.options.len() < MIN_OPTIONS || req.options.len() > MAX_OPTIONS {
        return Err(AppError::BadRequest(format!(
            "a vote needs between {} and {} options",
            MIN_OPTIONS, MAX_OPTIONS
        )));
    }
    if req.options.iter().any(|o| o.trim().is_empty()) {
        return Err(AppError::BadRequest("option content cannot be empty".into()));
    }
    if req.expired_at <= Utc::now() {
        return Err(AppError::BadRequest("expiry must be in the future".into()));
    }

    let (vote, options) = vote_repo::create_with_options(
        pool.get_ref(),
        &actor.0,
        &req.title,
        &req.content,
        req.category,
        req.display_range.unwrap_or(DisplayRange::Public),
        req.is_multi_pick.unwrap_or(false),
        req.expired_at,
        &req.options,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "vote": vote,
        "options": options,
    })))
}

/// GET /api/v1/votes - latest first
pub async fn list_votes(
    viewer: UserId,
    pool: web::Data<PgPool>,
    query: web::Query<TimelineQuery>,
) -> Result<HttpResponse> {
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let (limit, offset) = page.clamp();

    let votes =
        vote_repo::list_latest(pool.get_ref(), &viewer.0, query.category, limit, offset).await?;

    Ok(HttpResponse::Ok().json(VoteListResponse {
        votes,
        limit,
        offset,
    }))
}

/// GET /api/v1/votes/popular - by descending pick count
pub async fn popular_votes(
    viewer: UserId,
    pool: web::Data<PgPool>,
    query: web::Query<TimelineQuery>,
) -> Result<HttpResponse> {
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let (limit, offset) = page.clamp();

    let votes =
        vote_repo::list_popular(pool.get_ref(), &viewer.0, query.category, limit, offset).await?;

    Ok(HttpResponse::Ok().json(VoteListResponse {
        votes,
        limit,
        offset,
    }))
}

/// GET /api/v1/votes/search?target=title&keyword=...
pub async fn search_votes(
    viewer: UserId,
    pool: web::Data<PgPool>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let keyword = query.keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::BadRequest("keyword cannot be empty".into()));
    }

    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let (limit, offset) = page.clamp();

    let votes = vote_repo::search(
        pool.get_ref(),
        &viewer.0,
        query.target,
        keyword,
        limit,
        offset,
    )
    .await?;

    Ok(HttpResponse::Ok().json(VoteListResponse {
        votes,
        limit,
        offset,
    }))
}

/// GET /api/v1/votes/{id}
pub async fn get_vote(
    viewer: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let vote = vote_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    ensure_visible(pool.get_ref(), &vote, &viewer.0).await?;

    let options = vote_repo::options_with_counts(pool.get_ref(), vote.id).await?;
    let my_picks = pick_repo::picked_option_ids(pool.get_ref(), vote.id, &viewer.0).await?;
    let total_picks = options.iter().map(|o| o.pick_count).sum();

    Ok(HttpResponse::Ok().json(VoteDetailResponse {
        vote,
        options,
        total_picks,
        my_picks,
    }))
}

/// PATCH /api/v1/votes/{id} - owner only
pub async fn update_vote(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    req: web::Json<UpdateVoteRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let vote = vote_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(&vote.user_id, &actor.0, "vote")?;

    let updated = vote_repo::update_vote(
        pool.get_ref(),
        vote.id,
        req.title.as_deref(),
        req.content.as_deref(),
        req.category,
        req.display_range,
    )
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/v1/votes/{id} - owner only
pub async fn delete_vote(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let vote = vote_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(&vote.user_id, &actor.0, "vote")?;

    vote_repo::delete_by_id_and_user(pool.get_ref(), vote.id, &actor.0).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/votes/{id}/picks
pub async fn cast_picks(
    actor: UserId,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    req: web::Json<CastPicksRequest>,
) -> Result<HttpResponse> {
    let vote = vote_repo::get_by_id(pool.get_ref(), path.into_inner()).await?;
    ensure_visible(pool.get_ref(), &vote, &actor.0).await?;

    if vote.is_closed(Utc::now()) {
        return Err(AppError::BadRequest("vote is closed".into()));
    }

    pick_repo::cast_picks(pool.get_ref(), &vote, &actor.0, &req.option_ids).await?;

    let options = vote_repo::options_with_counts(pool.get_ref(), vote.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "options": options })))
}
