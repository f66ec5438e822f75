//! # Users
//!
//! The user record and its public projections.
//!
//! Relationships are adjacency lists of user ids embedded in the owning
//! record:
//!
//! ```text
//!   alice.friends          = [bob]          ◄──┐ symmetric
//!   bob.friends            = [alice]        ◄──┘
//!   carol.friend_requests  = [alice]        incoming: alice → carol pending
//! ```
//!
//! Both lists keep insertion order and set semantics.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Opaque unique id (UUID v4)
    pub id: String,
    /// Unique display name
    pub username: String,
    /// Unique email address, stored lowercased
    pub email: String,
    /// Argon2 PHC string; never leaves the core
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    /// Reference to the avatar image (URL or storage key)
    pub avatar: Option<String>,
    pub interests: Vec<String>,
    /// Set once the user has saved their profile at least once
    pub profile_complete: bool,
    /// Accepted friends (symmetric)
    pub friends: Vec<String>,
    /// Ids of users with a pending request *to* this user
    pub friend_requests: Vec<String>,
    /// Incremented on every successful save
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Create a fresh account with empty relationship lists.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = crate::time::now_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            bio: None,
            avatar: None,
            interests: Vec::new(),
            profile_complete: false,
            friends: Vec::new(),
            friend_requests: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_friend(&self, id: &str) -> bool {
        self.friends.iter().any(|f| f == id)
    }

    /// Whether `id` has a request pending to this user.
    pub fn has_request_from(&self, id: &str) -> bool {
        self.friend_requests.iter().any(|r| r == id)
    }

    /// Record an incoming request. Returns false if it was already pending.
    pub fn push_request(&mut self, from: &str) -> bool {
        if self.has_request_from(from) {
            return false;
        }
        self.friend_requests.push(from.to_string());
        true
    }

    /// Drop a pending request. Returns false if there was none.
    pub fn remove_request(&mut self, from: &str) -> bool {
        let before = self.friend_requests.len();
        self.friend_requests.retain(|r| r != from);
        self.friend_requests.len() != before
    }

    /// Add a friend. Returns false if already present.
    pub fn add_friend(&mut self, id: &str) -> bool {
        if self.is_friend(id) {
            return false;
        }
        self.friends.push(id.to_string());
        true
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

/// Public projection returned by search, recommendations and request lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.username.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
        }
    }
}

/// Full account view for the account owner (login, userinfo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub friends: Vec<String>,
    pub friend_requests: Vec<String>,
    pub avatar: Option<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
    pub profile_complete: bool,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            friends: user.friends.clone(),
            friend_requests: user.friend_requests.clone(),
            avatar: user.avatar.clone(),
            interests: user.interests.clone(),
            bio: user.bio.clone(),
            profile_complete: user.profile_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{}@example.com", name), "hash".into())
    }

    #[test]
    fn test_new_user_is_empty() {
        let alice = user("alice");
        assert!(alice.friends.is_empty());
        assert!(alice.friend_requests.is_empty());
        assert!(!alice.profile_complete);
        assert_eq!(alice.version, 0);
        assert!(!alice.id.is_empty());
    }

    #[test]
    fn test_request_list_has_set_semantics() {
        let mut bob = user("bob");
        assert!(bob.push_request("alice"));
        assert!(!bob.push_request("alice"));
        assert_eq!(bob.friend_requests, vec!["alice".to_string()]);

        assert!(bob.remove_request("alice"));
        assert!(!bob.remove_request("alice"));
        assert!(bob.friend_requests.is_empty());
    }

    #[test]
    fn test_add_friend_dedups() {
        let mut bob = user("bob");
        assert!(bob.add_friend("alice"));
        assert!(!bob.add_friend("alice"));
        assert_eq!(bob.friends.len(), 1);
    }

    #[test]
    fn test_summary_hides_credentials() {
        let alice = user("alice");
        let json = serde_json::to_value(alice.summary()).unwrap();
        assert_eq!(json["name"], "alice");
        assert!(json.get("password_hash").is_none());

        let full = serde_json::to_value(&alice).unwrap();
        assert!(full.get("password_hash").is_none());
    }

    #[test]
    fn test_account_view_uses_camel_case() {
        let alice = user("alice");
        let json = serde_json::to_value(AccountView::from(&alice)).unwrap();
        assert!(json.get("friendRequests").is_some());
        assert!(json.get("profileComplete").is_some());
    }
}
