use serde::Deserialize;

pub mod auth;
pub mod comments;
pub mod follows;
pub mod health;
pub mod users;
pub mod votes;

pub use auth::{login, oauth_authorize, oauth_callback, refresh_token, register};
pub use comments::{
    create_comment, delete_comment, like_comment, list_comments, unlike_comment, update_comment,
};
pub use follows::{follow_user, get_followers, get_following, unfollow_user};
pub use health::{health_check, readiness_check};
pub use users::{get_me, get_user, update_me};
pub use votes::{
    cast_picks, create_vote, delete_vote, get_vote, list_votes, popular_votes, search_votes,
    update_vote,
};

/// Bounded pagination shared by every listing endpoint.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn clamp(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(50).clamp(1, 100);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_bounded() {
        let q = PageQuery {
            limit: Some(100_000),
            offset: Some(-3),
        };
        assert_eq!(q.clamp(), (100, 0));

        let q = PageQuery {
            limit: None,
            offset: None,
        };
        assert_eq!(q.clamp(), (50, 0));
    }
}
