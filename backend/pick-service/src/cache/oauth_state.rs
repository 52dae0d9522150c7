/// One-time OAuth state nonces
///
/// The authorize endpoint stores a nonce keyed by the state value; the
/// callback consumes it exactly once. Entries expire on their own.
use redis_utils::{run_with_timeout, SharedConnectionManager};

use super::CacheError;

const STATE_TTL_SECS: usize = 600; // 10 minutes

fn state_key(state: &str) -> String {
    format!("pick:oauth:state:{}", state)
}

/// Record a freshly issued state for a provider.
pub async fn store_state(
    redis: &SharedConnectionManager,
    state: &str,
    provider: &str,
) -> Result<(), CacheError> {
    let key = state_key(state);
    let mut redis = redis.lock().await;
    run_with_timeout(
        redis::cmd("SET")
            .arg(&key)
            .arg(provider)
            .arg("EX")
            .arg(STATE_TTL_SECS)
            .query_async::<_, ()>(&mut *redis),
    )
    .await?;

    Ok(())
}

/// Consume a state, returning the provider it was issued for. GETDEL makes
/// replay of the same state fail.
pub async fn consume_state(
    redis: &SharedConnectionManager,
    state: &str,
) -> Result<Option<String>, CacheError> {
    let key = state_key(state);
    let mut redis = redis.lock().await;
    let provider: Option<String> = run_with_timeout(
        redis::cmd("GETDEL")
            .arg(&key)
            .query_async::<_, Option<String>>(&mut *redis),
    )
    .await?;

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_state() {
        assert_eq!(state_key("abc"), "pick:oauth:state:abc");
    }
}
