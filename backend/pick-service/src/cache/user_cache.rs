/// User profile caching
use redis_utils::{run_with_timeout, SharedConnectionManager};

use super::CacheError;
use crate::models::UserProfile;

const USER_CACHE_TTL_SECS: usize = 3600; // 1 hour

fn cache_key(user_id: &str) -> String {
    format!("pick:cache:user:{}", user_id)
}

/// Get a cached profile by user id.
///
/// A payload that no longer deserializes is logged and reported as a miss so
/// the lookup falls through to the store instead of failing the request.
pub async fn get_cached_profile(
    redis: &SharedConnectionManager,
    user_id: &str,
) -> Result<Option<UserProfile>, CacheError> {
    let key = cache_key(user_id);
    let mut redis = redis.lock().await;
    let cached: Option<String> = run_with_timeout(
        redis::cmd("GET")
            .arg(&key)
            .query_async::<_, Option<String>>(&mut *redis),
    )
    .await?;

    match cached {
        Some(json) => match serde_json::from_str::<UserProfile>(&json) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!(
                    "corrupt cache entry for user {}, treating as miss: {}",
                    user_id,
                    e
                );
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

/// Store a profile snapshot with the standard TTL.
pub async fn set_cached_profile(
    redis: &SharedConnectionManager,
    profile: &UserProfile,
) -> Result<(), CacheError> {
    let key = cache_key(&profile.user_id);
    let json = serde_json::to_string(profile)?;

    let mut redis = redis.lock().await;
    run_with_timeout(
        redis::cmd("SET")
            .arg(&key)
            .arg(&json)
            .arg("EX")
            .arg(USER_CACHE_TTL_SECS)
            .query_async::<_, ()>(&mut *redis),
    )
    .await?;

    Ok(())
}

/// Drop the cache entry after the underlying user row changed.
pub async fn evict_profile(
    redis: &SharedConnectionManager,
    user_id: &str,
) -> Result<(), CacheError> {
    let key = cache_key(user_id);
    let mut redis = redis.lock().await;
    run_with_timeout(
        redis::cmd("DEL")
            .arg(&key)
            .query_async::<_, ()>(&mut *redis),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_user() {
        assert_eq!(cache_key("alice"), "pick:cache:user:alice");
    }
}
