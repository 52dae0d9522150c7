use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Vote category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vote_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Free,
    Study,
    Career,
    Love,
    Food,
    Hobby,
    Etc,
}

/// Who can see a vote on the timeline and its detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "display_range", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisplayRange {
    Public,
    Follower,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub password_hash: String,
    pub email: String,
    pub nickname: String,
    pub memo: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serialized projection of [`User`] stored in the cache and returned by the
/// profile endpoints. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub nickname: String,
    pub memo: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            user_id: user.user_id,
            email: user.email,
            nickname: user.nickname,
            memo: user.memo,
            birthday: user.birthday,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Follow {
    pub id: i64,
    pub from_user: String,
    pub to_user: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub display_range: DisplayRange,
    pub is_multi_pick: bool,
    pub created_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Vote {
    /// A vote is implicitly closed once its expiry has passed.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.expired_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoteOption {
    pub id: i64,
    pub vote_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pick {
    pub id: i64,
    pub user_id: String,
    pub vote_option_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoteComment {
    pub id: i64,
    pub vote_id: i64,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentLike {
    pub id: i64,
    pub comment_id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn vote_closes_at_expiry() {
        let now = Utc::now();
        let vote = Vote {
            id: 1,
            user_id: "alice".into(),
            title: "t".into(),
            content: "c".into(),
            category: Category::Free,
            display_range: DisplayRange::Public,
            is_multi_pick: false,
            created_at: now - Duration::days(1),
            expired_at: now + Duration::days(2),
        };
        assert!(!vote.is_closed(now));
        assert!(vote.is_closed(now + Duration::days(3)));
    }

    #[test]
    fn profile_drops_password_hash() {
        let user = User {
            user_id: "alice".into(),
            password_hash: "secret-hash".into(),
            email: "alice@example.com".into(),
            nickname: "A".into(),
            memo: None,
            birthday: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let profile = UserProfile::from(user);
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
