//! End-to-end scenarios for the cache-aside account path, driven against
//! in-memory store/cache implementations of the service seams.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pick_service::cache::CacheError;
use pick_service::models::{User, UserProfile};
use pick_service::security::password;
use pick_service::services::accounts::{
    AccountService, NewUser, ProfileChanges, UserCache, UserStore,
};
use pick_service::AppError;

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

    fn seed(&self, user_id: &str, password_plain: &str, nickname: &str) {
        let user = User {
            user_id: user_id.to_string(),
            password_hash: password::hash_password(password_plain).unwrap(),
            email: format!("{}@example.com", user_id),
            nickname: nickname.to_string(),
            memo: None,
            birthday: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.rows
            .lock()
            .unwrap()
            .insert(user_id.to_string(), user);
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn insert(&self, candidate: &NewUser) -> Result<User, AppError> {
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

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<User, AppError> {
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
        if let Some(birthday) = changes.birthday {
            user.birthday = Some(birthday);
        }
        Ok(user.clone())
    }
}

#[derive(Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, UserProfile>>,
}

impl MemoryCache {
    fn contains(&self, user_id: &str) -> bool {
        self.entries.lock().unwrap().contains_key(user_id)
    }
}

#[async_trait]
impl UserCache for MemoryCache {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, CacheError> {
        Ok(self.entries.lock().unwrap().get(user_id).cloned())
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn evict(&self, user_id: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap().remove(user_id);
        Ok(())
    }
}

fn harness() -> (Arc<MemoryStore>, Arc<MemoryCache>, AccountService) {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::default());
    let service = AccountService::new(store.clone(), cache.clone());
    (store, cache, service)
}

#[tokio::test]
async fn resolving_alice_populates_the_cache_and_then_skips_the_store() {
    let (store, cache, service) = harness();
    store.seed("alice", "pw", "A");
    assert!(!cache.contains("alice"));

    // First resolution: store hit, cache repopulated
    let profile = service.resolve("alice").await.unwrap();
    assert_eq!(profile.user_id, "alice");
    assert_eq!(profile.nickname, "A");
    assert!(cache.contains("alice"));

    // Second resolution: identical profile, no store read
    let reads_after_first = store.reads.load(Ordering::SeqCst);
    let second = service.resolve("alice").await.unwrap();
    assert_eq!(second, profile);
    assert_eq!(store.reads.load(Ordering::SeqCst), reads_after_first);
}

#[tokio::test]
async fn resolving_a_missing_user_fails_and_leaves_the_cache_unchanged() {
    let (_store, cache, service) = harness();

    let err = service.resolve("ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!cache.contains("ghost"));
}

#[tokio::test]
async fn registering_the_same_user_id_twice_keeps_exactly_one_record() {
    let (store, _cache, service) = harness();

    let candidate = NewUser {
        user_id: "alice".into(),
        password_hash: password::hash_password("pw").unwrap(),
        email: "alice@example.com".into(),
        nickname: "A".into(),
        memo: None,
        birthday: None,
    };

    service.register(candidate.clone()).await.unwrap();
    let err = service.register(candidate).await.unwrap_err();
    assert!(matches!(err, AppError::Duplicate(_)));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn profile_update_invalidates_the_snapshot() {
    let (store, cache, service) = harness();
    store.seed("alice", "pw", "A");

    service.resolve("alice").await.unwrap();
    assert!(cache.contains("alice"));

    let updated = service
        .update_profile(
            "alice",
            ProfileChanges {
                nickname: Some("A-renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.nickname, "A-renamed");
    assert!(!cache.contains("alice"));

    // Next resolve repopulates from the updated row
    let fresh = service.resolve("alice").await.unwrap();
    assert_eq!(fresh.nickname, "A-renamed");
}
