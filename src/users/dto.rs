use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recipes::repo::RecipeBrief;
use crate::users::repo::User;

/// Profile as seen by a viewer, with the follow flag resolved against them.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// One entry of the subscriptions listing: a followed author plus a preview
/// of their most recent recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionItem {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeBrief>,
    pub recipes_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    #[serde(default = "default_recipes_limit")]
    pub recipes_limit: i64,
}

fn default_recipes_limit() -> i64 {
    3
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "author@example.com".into(),
            username: "author".into(),
            first_name: "Julia".into(),
            last_name: "Child".into(),
            password_hash: "secret-hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn profile_never_exposes_password_hash() {
        let profile = UserProfile::new(sample_user(), true);
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["is_subscribed"], true);
    }

    #[test]
    fn subscription_item_flattens_profile_fields() {
        let item = SubscriptionItem {
            author: UserProfile::new(sample_user(), true),
            recipes: vec![],
            recipes_count: 0,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["email"], "author@example.com");
        assert_eq!(json["recipes_count"], 0);
        assert!(json["recipes"].as_array().unwrap().is_empty());
    }
}
