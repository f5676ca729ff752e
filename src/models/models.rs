use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored user document.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub followers_count: usize,
    #[serde(default)]
    pub following_count: usize,
    #[serde(default)]
    pub followers_list: Vec<String>,
    #[serde(default)]
    pub following_list: Vec<String>,
    #[serde(default)]
    pub posts_count: usize,
    #[serde(default)]
    pub posts_list: Vec<String>,
}

impl User {
    pub fn new(id: String, name: String, email: String, password: String) -> Self {
        Self {
            id,
            name,
            email,
            password,
            followers_count: 0,
            following_count: 0,
            followers_list: Vec::new(),
            following_list: Vec::new(),
            posts_count: 0,
            posts_list: Vec::new(),
        }
    }

    /// Realigns the cached counters with their lists.
    pub fn sync_counts(&mut self) {
        self.followers_count = self.followers_list.len();
        self.following_count = self.following_list.len();
        self.posts_count = self.posts_list.len();
    }
}

/// Stored post document. `user` holds the owner id.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// === Response views ===

/// User document without the password hash.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub followers_count: usize,
    pub following_count: usize,
    pub followers_list: Vec<String>,
    pub following_list: Vec<String>,
    pub posts_count: usize,
    pub posts_list: Vec<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            followers_count: user.followers_count,
            following_count: user.following_count,
            followers_list: user.followers_list.clone(),
            following_list: user.following_list.clone(),
            posts_count: user.posts_count,
            posts_list: user.posts_list.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AuthorSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// A post with its owner resolved.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostWithAuthor {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PostWithAuthor {
    pub fn new(post: Post, author: &User) -> Self {
        Self {
            id: post.id,
            user: AuthorSummary {
                id: author.id.clone(),
                name: author.name.clone(),
            },
            content: post.content,
            created_at: post.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub following_count: usize,
    pub followers_list: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub following_count: usize,
    pub is_following: bool,
    pub followers_list: Vec<String>,
    pub followers_count: usize,
    pub following_list: Vec<String>,
}

impl UserStatus {
    pub fn for_caller(user: &User, caller_id: &str) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            following_count: user.following_count,
            is_following: user.followers_list.iter().any(|id| id == caller_id),
            followers_list: user.followers_list.clone(),
            followers_count: user.followers_count,
            following_list: user.following_list.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FollowerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub following_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_list: Option<Vec<String>>,
}

#[derive(Serialize, Debug)]
pub struct ContactSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

/// User with followers, followings and posts expanded.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub followers_count: usize,
    pub following_count: usize,
    pub posts_count: usize,
    pub followers_list: Vec<FollowerSummary>,
    pub following_list: Vec<FollowerSummary>,
    pub posts_list: Vec<Post>,
}

/// JWT claims binding a user id.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_hides_password() {
        let user = User::new("1".into(), "ann".into(), "ann@x.io".into(), "$argon2id$hash".into());
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["_id"], "1");
        assert_eq!(json["followersCount"], 0);
    }

    #[test]
    fn test_user_status_flags_caller_membership() {
        let mut user = User::new("2".into(), "bo".into(), "bo@x.io".into(), String::new());
        user.followers_list.push("1".into());
        assert!(UserStatus::for_caller(&user, "1").is_following);
        assert!(!UserStatus::for_caller(&user, "3").is_following);
    }
}
