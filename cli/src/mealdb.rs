use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use recipebox_core::mealdb::{CategoryResponse, MealResponse};
use recipebox_core::repository::{FetchError, RecipeSource};

pub struct MealDbClient {
    client: reqwest::Client,
    base: String,
}

impl MealDbClient {
    pub fn new(base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "recipebox-cli/{} (recipe organizer)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base: base.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{endpoint}", self.base);
        debug!(%url, ?query, "requesting");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.to_string()));
        }

        resp.json()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

impl RecipeSource for MealDbClient {
    async fn search_by_name(&self, query: &str) -> Result<MealResponse, FetchError> {
        self.get("search.php", &[("s", query)]).await
    }

    async fn filter_by_ingredient(&self, ingredient: &str) -> Result<MealResponse, FetchError> {
        self.get("filter.php", &[("i", ingredient)]).await
    }

    async fn random(&self) -> Result<MealResponse, FetchError> {
        self.get("random.php", &[]).await
    }

    async fn lookup(&self, id: &str) -> Result<MealResponse, FetchError> {
        self.get("lookup.php", &[("i", id)]).await
    }

    async fn categories(&self) -> Result<CategoryResponse, FetchError> {
        self.get("categories.php", &[]).await
    }

    async fn filter_by_category(&self, category: &str) -> Result<MealResponse, FetchError> {
        self.get("filter.php", &[("c", category)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_BASE;

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = MealDbClient::new("http://127.0.0.1:9/").unwrap();
        let err = client.random().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    // --- Integration tests (hit real TheMealDB API) ---

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_lookup_known_meal() {
        let client = MealDbClient::new(DEFAULT_API_BASE).unwrap();
        let response = client.lookup("52772").await.unwrap();
        let meal = &response.meals.expect("52772 should exist")[0];
        assert_eq!(meal.id_meal, "52772");
        assert!(!meal.str_meal.is_empty());
    }

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_search_unknown_returns_null_meals() {
        let client = MealDbClient::new(DEFAULT_API_BASE).unwrap();
        let response = client
            .search_by_name("zzzz-no-such-meal-zzzz")
            .await
            .unwrap();
        assert!(response.meals.is_none());
    }

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_categories_non_empty() {
        let client = MealDbClient::new(DEFAULT_API_BASE).unwrap();
        let response = client.categories().await.unwrap();
        assert!(!response.categories.unwrap_or_default().is_empty());
    }
}
