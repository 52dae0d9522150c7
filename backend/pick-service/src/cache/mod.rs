use thiserror::Error;

pub mod oauth_state;
pub mod user_cache;

pub use user_cache::{evict_profile, get_cached_profile, set_cached_profile};

/// Cache-layer error. By contract this type never crosses the service
/// boundary: callers absorb it as a miss (reads) or a skipped write.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] redis::RedisError),

    #[error("cache codec: {0}")]
    Codec(#[from] serde_json::Error),
}
