//! User directory search.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::UserStore;
use crate::users::{User, UserSummary};

/// Case-insensitive username lookup over the user store.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn UserStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Users whose username contains `query`, ignoring case.
    ///
    /// The query is matched literally. A missing or blank query is
    /// [`Error::InvalidQuery`] rather than an empty result.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<UserSummary>> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::InvalidQuery("Query parameter is required".into()))?;

        let users = self.store.find_by_name(query).await?;
        tracing::debug!(query, results = users.len(), "Directory search");
        Ok(users.iter().map(User::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn directory(names: &[&str]) -> Directory {
        let db = Database::open(None).await.unwrap();
        for name in names {
            let mut user = User::new(name.to_string(), format!("{}@example.com", name), "x".into());
            db.insert(&mut user).await.unwrap();
        }
        Directory::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_search_matches_substring_ignoring_case() {
        let directory = directory(&["Anna", "Joanna", "Bob"]).await;
        let names: Vec<String> = directory
            .search(Some("ann"))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Anna".to_string(), "Joanna".to_string()]);

        assert_eq!(directory.search(Some("BOB")).await.unwrap().len(), 1);
        assert!(directory.search(Some("zed")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let directory = directory(&["Anna"]).await;
        assert!(matches!(directory.search(Some("")).await, Err(Error::InvalidQuery(_))));
        assert!(matches!(directory.search(Some("   ")).await, Err(Error::InvalidQuery(_))));
        assert!(matches!(directory.search(None).await, Err(Error::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_pattern_characters_are_literal() {
        let directory = directory(&["a_b", "axb"]).await;
        let results = directory.search(Some("_")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "a_b");
    }
}
