//! Account resolution and registration.
//!
//! The lookup path is cache-aside: Redis holds a serialized profile snapshot
//! under the user id, the database is the source of truth. Cache failures of
//! any kind are soft: they degrade to a store read, never to a request
//! failure.

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;

use redis_utils::SharedConnectionManager;

use crate::cache::{self, CacheError};
use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::models::{User, UserProfile};
use crate::security::password;
use crate::services::oauth::OAuthUserInfo;

/// Candidate row for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub password_hash: String,
    pub email: String,
    pub nickname: String,
    pub memo: Option<String>,
    pub birthday: Option<NaiveDate>,
}

/// Profile fields a user may change after registration.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub nickname: Option<String>,
    pub memo: Option<String>,
    pub birthday: Option<NaiveDate>,
}

/// Durable user store seam.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>>;
    async fn insert(&self, candidate: &NewUser) -> Result<User>;
    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<User>;
}

/// User cache seam. Errors are [`CacheError`] so they cannot ride `?` into
/// an HTTP response; the service absorbs them.
#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, CacheError>;
    async fn put(&self, profile: &UserProfile) -> std::result::Result<(), CacheError>;
    async fn evict(&self, user_id: &str) -> std::result::Result<(), CacheError>;
}

/// Postgres-backed [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>> {
        user_repo::find_by_user_id(&self.pool, user_id).await
    }

    async fn insert(&self, candidate: &NewUser) -> Result<User> {
        user_repo::create_user(
            &self.pool,
            &candidate.user_id,
            &candidate.password_hash,
            &candidate.email,
            &candidate.nickname,
            candidate.memo.as_deref(),
            candidate.birthday,
        )
        .await
    }

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<User> {
        user_repo::update_profile(
            &self.pool,
            user_id,
            changes.nickname.as_deref(),
            changes.memo.as_deref(),
            changes.birthday,
        )
        .await
    }
}

/// Redis-backed [`UserCache`].
pub struct RedisUserCache {
    redis: SharedConnectionManager,
}

impl RedisUserCache {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, CacheError> {
        cache::get_cached_profile(&self.redis, user_id).await
    }

    async fn put(&self, profile: &UserProfile) -> std::result::Result<(), CacheError> {
        cache::set_cached_profile(&self.redis, profile).await
    }

    async fn evict(&self, user_id: &str) -> std::result::Result<(), CacheError> {
        cache::evict_profile(&self.redis, user_id).await
    }
}

/// User resolution, registration and credential checks.
pub struct AccountService {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn UserCache>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, cache: Arc<dyn UserCache>) -> Self {
        Self { store, cache }
    }

    /// Production wiring: Postgres store, Redis cache.
    pub fn postgres_redis(pool: PgPool, redis: SharedConnectionManager) -> Self {
        Self::new(
            Arc::new(PgUserStore::new(pool)),
            Arc::new(RedisUserCache::new(redis)),
        )
    }

    /// Resolve a user id to its profile, cache first.
    ///
    /// Every successful resolution rewrites the cache entry, refreshing the
    /// TTL on hits and repopulating it on misses. A store miss is terminal
    /// NotFound and leaves the cache untouched.
    pub async fn resolve(&self, user_id: &str) -> Result<UserProfile> {
        match self.cache.get(user_id).await {
            Ok(Some(profile)) => {
                if let Err(e) = self.cache.put(&profile).await {
                    tracing::warn!("user cache refresh failed for {}: {}", user_id, e);
                }
                return Ok(profile);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    "user cache read failed for {}, falling back to store: {}",
                    user_id,
                    e
                );
            }
        }

        let user = self
            .store
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user not found: {}", user_id)))?;

        let profile = UserProfile::from(user);
        if let Err(e) = self.cache.put(&profile).await {
            tracing::warn!("user cache write failed for {}: {}", user_id, e);
        }

        Ok(profile)
    }

    /// Register a new user.
    ///
    /// The lookup is an optimization for a friendly error; the store's
    /// unique constraint is what actually decides concurrent races.
    pub async fn register(&self, candidate: NewUser) -> Result<UserProfile> {
        if self
            .store
            .find_by_user_id(&candidate.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Duplicate(format!(
                "user already exists: {}",
                candidate.user_id
            )));
        }

        let user = self.store.insert(&candidate).await?;
        Ok(UserProfile::from(user))
    }

    /// Check credentials against the store and warm the cache on success.
    ///
    /// The password check always reads the durable row; only the returned
    /// profile goes through the cache.
    pub async fn authenticate(&self, user_id: &str, password_input: &str) -> Result<UserProfile> {
        let user = self
            .store
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("invalid user id or password".into()))?;

        if !password::verify_password(password_input, &user.password_hash)? {
            return Err(AppError::Authentication(
                "invalid user id or password".into(),
            ));
        }

        let profile = UserProfile::from(user);
        if let Err(e) = self.cache.put(&profile).await {
            tracing::warn!("user cache warm failed for {}: {}", user_id, e);
        }

        Ok(profile)
    }

    /// Apply profile changes, then drop the now-stale cache entry.
    pub async fn update_profile(
        &self,
        user_id: &str,
        changes: ProfileChanges,
    ) -> Result<UserProfile> {
        let user = self.store.update_profile(user_id, &changes).await?;

        if let Err(e) = self.cache.evict(user_id).await {
            tracing::warn!("user cache eviction failed for {}: {}", user_id, e);
        }

        Ok(UserProfile::from(user))
    }

    /// Resolve an OAuth identity to a local account, creating one on first
    /// login. The local user id is `{provider}_{provider_user_id}`.
    pub async fn find_or_create_oauth(&self, info: &OAuthUserInfo) -> Result<UserProfile> {
        let user_id = format!("{}_{}", info.provider, info.provider_user_id);

        if let Some(user) = self.store.find_by_user_id(&user_id).await? {
            let profile = UserProfile::from(user);
            if let Err(e) = self.cache.put(&profile).await {
                tracing::warn!("user cache warm failed for {}: {}", user_id, e);
            }
            return Ok(profile);
        }

        // OAuth accounts never log in with a password; store a hash of a
        // random secret so the column stays non-null and unusable.
        let throwaway: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let candidate = NewUser {
            user_id: user_id.clone(),
            password_hash: password::hash_password(&throwaway)?,
            email: info
                .email
                .clone()
                .unwrap_or_else(|| format!("{}@oauth.invalid", user_id)),
            nickname: info
                .display_name
                .clone()
                .unwrap_or_else(|| user_id.clone()),
            memo: None,
            birthday: None,
        };

        match self.register(candidate).await {
            Ok(profile) => Ok(profile),
            // Lost a concurrent first-login race; the row exists now.
            Err(AppError::Duplicate(_)) => self.resolve(&user_id).await,
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryStore {
        rows: Mutex<HashMap<String, User>>,
        reads: AtomicUsize,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                reads: AtomicUsize::new(0),
            }
        }

        fn with_user(self, user_id: &str, password: &str, nickname: &str) -> Self {
            let user = User {
                user_id: user_id.to_string(),
                password_hash: password::hash_password(password).unwrap(),
                email: format!("{}@example.com", user_id),
                nickname: nickname.to_string(),
                memo: None,
                birthday: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.rows.lock().unwrap().insert(user_id.to_string(), user);
            self
        }
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        }

        async fn insert(&self, candidate: &NewUser) -> Result<User> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&candidate.user_id) {
                return Err(AppError::Duplicate(candidate.user_id.clone()));
            }
            let user = User {
                user_id: candidate.user_id.clone(),
                password_hash: candidate.password_hash.clone(),
                email: candidate.email.clone(),
                nickname: candidate.nickname.clone(),
                memo: candidate.memo.clone(),
                birthday: candidate.birthday,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            rows.insert(candidate.user_id.clone(), user.clone());
            Ok(user)
        }

        async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<User> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows
                .get_mut(user_id)
                .ok_or_else(|| AppError::NotFound(user_id.to_string()))?;
            if let Some(nickname) = &changes.nickname {
                user.nickname = nickname.clone();
            }
            if let Some(memo) = &changes.memo {
                user.memo = Some(memo.clone());
            }
            Ok(user.clone())
        }
    }

    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, UserProfile>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl MemoryCache {
        fn broken_reads() -> Self {
            Self {
                fail_reads: true,
                ..Default::default()
            }
        }

        fn broken_writes() -> Self {
            Self {
                fail_writes: true,
                ..Default::default()
            }
        }

        fn io_error() -> CacheError {
            CacheError::Io(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            )))
        }
    }

    #[async_trait]
    impl UserCache for MemoryCache {
        async fn get(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, CacheError> {
            if self.fail_reads {
                return Err(Self::io_error());
            }
            Ok(self.entries.lock().unwrap().get(user_id).cloned())
        }

        async fn put(&self, profile: &UserProfile) -> std::result::Result<(), CacheError> {
            if self.fail_writes {
                return Err(Self::io_error());
            }
            self.entries
                .lock()
                .unwrap()
                .insert(profile.user_id.clone(), profile.clone());
            Ok(())
        }

        async fn evict(&self, user_id: &str) -> std::result::Result<(), CacheError> {
            self.entries.lock().unwrap().remove(user_id);
            Ok(())
        }
    }

    fn service(store: MemoryStore, cache: MemoryCache) -> AccountService {
        AccountService::new(Arc::new(store), Arc::new(cache))
    }

    #[tokio::test]
    async fn resolve_miss_populates_cache_from_store() {
        let svc = service(
            MemoryStore::new().with_user("alice", "pw", "A"),
            MemoryCache::default(),
        );

        let profile = svc.resolve("alice").await.unwrap();
        assert_eq!(profile.user_id, "alice");
        assert_eq!(profile.nickname, "A");

        let cached = svc.cache.get("alice").await.unwrap();
        assert_eq!(cached.unwrap().nickname, "A");
    }

    #[tokio::test]
    async fn resolve_unknown_user_is_not_found_and_cache_stays_empty() {
        let svc = service(MemoryStore::new(), MemoryCache::default());

        let err = svc.resolve("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(svc.cache.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_resolve_hits_cache_without_a_store_read() {
        let store = Arc::new(MemoryStore::new().with_user("alice", "pw", "A"));
        let svc = AccountService::new(store.clone(), Arc::new(MemoryCache::default()));

        let first = svc.resolve("alice").await.unwrap();
        let reads_after_first = store.reads.load(Ordering::SeqCst);

        let second = svc.resolve("alice").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.reads.load(Ordering::SeqCst), reads_after_first);
    }

    #[tokio::test]
    async fn cache_read_failure_falls_back_to_store() {
        let svc = service(
            MemoryStore::new().with_user("alice", "pw", "A"),
            MemoryCache::broken_reads(),
        );

        let profile = svc.resolve("alice").await.unwrap();
        assert_eq!(profile.nickname, "A");
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_the_read() {
        let svc = service(
            MemoryStore::new().with_user("alice", "pw", "A"),
            MemoryCache::broken_writes(),
        );

        let profile = svc.resolve("alice").await.unwrap();
        assert_eq!(profile.user_id, "alice");
    }

    #[tokio::test]
    async fn duplicate_registration_fails_and_keeps_one_record() {
        let svc = service(MemoryStore::new(), MemoryCache::default());

        let candidate = NewUser {
            user_id: "alice".into(),
            password_hash: password::hash_password("pw").unwrap(),
            email: "alice@example.com".into(),
            nickname: "A".into(),
            memo: None,
            birthday: None,
        };

        svc.register(candidate.clone()).await.unwrap();
        let err = svc.register(candidate).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));

        let profile = svc.resolve("alice").await.unwrap();
        assert_eq!(profile.nickname, "A");
    }

    #[tokio::test]
    async fn authenticate_checks_the_password_and_warms_the_cache() {
        let svc = service(
            MemoryStore::new().with_user("alice", "pw", "A"),
            MemoryCache::default(),
        );

        let profile = svc.authenticate("alice", "pw").await.unwrap();
        assert_eq!(profile.user_id, "alice");
        assert!(svc.cache.get("alice").await.unwrap().is_some());

        let err = svc.authenticate("alice", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
        let err = svc.authenticate("ghost", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn update_profile_evicts_the_cache_entry() {
        let svc = service(
            MemoryStore::new().with_user("alice", "pw", "A"),
            MemoryCache::default(),
        );

        svc.resolve("alice").await.unwrap();
        assert!(svc.cache.get("alice").await.unwrap().is_some());

        let changes = ProfileChanges {
            nickname: Some("A2".into()),
            ..Default::default()
        };
        let updated = svc.update_profile("alice", changes).await.unwrap();
        assert_eq!(updated.nickname, "A2");
        assert!(svc.cache.get("alice").await.unwrap().is_none());
    }
}
