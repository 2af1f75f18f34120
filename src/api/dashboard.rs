use log::warn;
use serde_json::Value;

use super::unwrap_data;
use crate::config::endpoints;
use crate::http::{ApiClient, ApiError, RequestOptions};

/// Dashboard and profile loaders.
#[derive(Clone)]
pub struct DashboardApi {
    client: ApiClient,
}

impl DashboardApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Aggregated review metrics and recent reviews for the signed-in shop.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Value, ApiError> {
        self.fetch(endpoints::DASHBOARD).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn profile(&self) -> Result<Value, ApiError> {
        self.fetch(endpoints::PROFILE).await
    }

    async fn fetch(&self, endpoint: &str) -> Result<Value, ApiError> {
        match self.client.request(endpoint, RequestOptions::get()).await {
            Ok(value) => Ok(unwrap_data(value)),
            Err(e) => {
                if e.status == 401 {
                    // The session is dead; don't keep sending the token.
                    if let Err(clear_err) = self.client.store().clear() {
                        warn!("Failed to clear expired session: {:#}", clear_err);
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CredentialStore, MemoryStore, MockCredentialStore};
    use crate::test_utils::client_for;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dashboard_unwraps_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dashboard")
            .match_header("authorization", "Bearer jwt-1")
            .with_status(200)
            .with_body(
                r#"{"status":"success","data":{"metrics":{"total_reviews":3,"positive_reviews":2}}}"#,
            )
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_token("jwt-1"));
        let api = DashboardApi::new(client_for(&server.url(), store));

        let data = api.dashboard().await.unwrap();

        mock.assert_async().await;
        assert_eq!(data, json!({"metrics": {"total_reviews": 3, "positive_reviews": 2}}));
    }

    #[tokio::test]
    async fn test_profile_returns_payload() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/profile")
            .with_status(200)
            .with_body(r#"{"data":{"email":"owner@shop.com","shop_name":"Bean"}}"#)
            .create_async()
            .await;

        let api = DashboardApi::new(client_for(
            &server.url(),
            Arc::new(MemoryStore::with_token("jwt-1")),
        ));

        let profile = api.profile().await.unwrap();
        assert_eq!(profile["shop_name"], "Bean");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/dashboard")
            .with_status(401)
            .with_body(r#"{"status":"fail","message":"token expired"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_token("stale"));
        let api = DashboardApi::new(client_for(&server.url(), store.clone()));

        let err = api.dashboard().await.unwrap_err();

        assert_eq!(err.status, 401);
        assert_eq!(err.message, "token expired");
        assert_eq!(store.get_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_errors_keep_session() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/dashboard")
            .with_status(404)
            .create_async()
            .await;

        let mut store = MockCredentialStore::new();
        store
            .expect_get_token()
            .returning(|| Ok(Some("jwt-1".to_string())));
        store.expect_clear().never();

        let api = DashboardApi::new(client_for(&server.url(), Arc::new(store)));
        let err = api.dashboard().await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.message, "HTTP 404");
    }
}
