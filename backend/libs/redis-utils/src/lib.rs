use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Upper bound for any single Redis command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis connection pool.
///
/// The connection manager reconnects on its own; callers share it through
/// [`SharedConnectionManager`].
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client =
            Client::open(redis_url).context("failed to parse REDIS_URL connection string")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        info!("Redis connection manager established");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}

/// Run a Redis command future with [`COMMAND_TIMEOUT`] applied.
///
/// An elapsed timeout surfaces as a `RedisError` of kind `IoError` so callers
/// handle slow and broken connections the same way.
pub async fn run_with_timeout<T, F>(fut: F) -> std::result::Result<T, RedisError>
where
    F: Future<Output = std::result::Result<T, RedisError>>,
{
    match timeout(COMMAND_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(RedisError::from((
            redis::ErrorKind::IoError,
            "redis command timed out",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_with_timeout_passes_through_ok() {
        let value = run_with_timeout(async { Ok::<_, RedisError>(42) }).await;
        assert_eq!(value.unwrap(), 42);
    }

    #[tokio::test]
    async fn run_with_timeout_times_out_slow_commands() {
        let slow = run_with_timeout(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, RedisError>(())
        })
        .await;
        assert!(slow.is_err());
    }
}
