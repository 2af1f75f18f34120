//! Local session checks against the stored JWT.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::DashboardApi;
use crate::http::ApiClient;
use crate::store::CredentialStore;

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Reads the `exp` claim without verifying the signature.
fn token_expiry(token: &str) -> Result<Option<f64>> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .context("Token is not a JWT")?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("Token payload is not base64url")?;
    let claims: Claims = serde_json::from_slice(&bytes).context("Token payload is not JSON")?;
    Ok(claims.exp)
}

/// Whether a stored token exists and has not expired at `now`.
///
/// A token that cannot be decoded, or that has expired, is removed.
pub fn is_authenticated(store: &dyn CredentialStore, now: SystemTime) -> bool {
    let token = match store.get_token() {
        Ok(Some(token)) => token,
        Ok(None) => return false,
        Err(e) => {
            warn!("Failed to read stored token: {:#}", e);
            return false;
        }
    };

    let now = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    let valid = match token_expiry(&token) {
        Ok(Some(exp)) => exp > now,
        Ok(None) => {
            debug!("Stored token has no exp claim");
            return false;
        }
        Err(e) => {
            debug!("Stored token is malformed: {:#}", e);
            false
        }
    };

    if !valid {
        if let Err(e) = store.clear() {
            warn!("Failed to clear stored session: {:#}", e);
        }
    }
    valid
}

/// Confirms the session with the backend.
///
/// Returns the profile when the local token looks valid and the backend
/// accepts it. Any failure logs out locally and yields `None`.
#[tracing::instrument(skip(client))]
pub async fn check_auth_status(client: &ApiClient) -> Result<Option<Value>> {
    if !is_authenticated(client.store().as_ref(), SystemTime::now()) {
        return Ok(None);
    }

    match DashboardApi::new(client.clone()).profile().await {
        Ok(profile) => Ok(Some(profile)),
        Err(e) => {
            warn!("Token validation failed: {}", e);
            client.store().clear()?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockCredentialStore};
    use crate::test_utils::{client_for, jwt_with_exp};
    use std::sync::Arc;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_no_token_is_not_authenticated() {
        assert!(!is_authenticated(&MemoryStore::new(), at(1_000)));
    }

    #[test]
    fn test_unexpired_token() {
        let store = MemoryStore::with_token(&jwt_with_exp(2_000));
        assert!(is_authenticated(&store, at(1_000)));
        assert!(store.get_token().unwrap().is_some());
    }

    #[test]
    fn test_expired_token_is_cleared() {
        let store = MemoryStore::with_token(&jwt_with_exp(2_000));
        assert!(!is_authenticated(&store, at(2_000)));
        assert_eq!(store.get_token().unwrap(), None);
    }

    #[test]
    fn test_malformed_token_is_cleared() {
        for token in ["opaque", "a..c", "a.!!!.c", "a.bm90IGpzb24.c"] {
            let store = MemoryStore::with_token(token);
            assert!(!is_authenticated(&store, at(0)), "{} accepted", token);
            assert_eq!(store.get_token().unwrap(), None);
        }
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        // {"sub":"x","exp":2000}
        let store = MemoryStore::with_token("h.eyJzdWIiOiJ4IiwiZXhwIjoyMDAwfQ==.s");
        assert!(is_authenticated(&store, at(10)));
        let store = MemoryStore::with_token("h.eyJzdWIiOiJ4IiwiZXhwIjoyMDAwfQ.s");
        assert!(is_authenticated(&store, at(10)));
    }

    #[test]
    fn test_token_without_exp_is_kept() {
        // {"sub":"x"}
        let store = MemoryStore::with_token("h.eyJzdWIiOiJ4In0.s");
        assert!(!is_authenticated(&store, at(0)));
        assert!(store.get_token().unwrap().is_some());
    }

    #[test]
    fn test_store_errors_mean_signed_out() {
        let mut store = MockCredentialStore::new();
        store
            .expect_get_token()
            .returning(|| Err(anyhow::anyhow!("locked")));
        store.expect_clear().never();
        assert!(!is_authenticated(&store, at(0)));
    }

    #[tokio::test]
    async fn test_check_auth_status_returns_profile() {
        let token = jwt_with_exp(u32::MAX as u64);
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/profile")
            .match_header("authorization", format!("Bearer {}", token).as_str())
            .with_status(200)
            .with_body(r#"{"data":{"shop_name":"Bean"}}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_token(&token));
        let client = client_for(&server.url(), store);

        let profile = check_auth_status(&client).await.unwrap().unwrap();
        assert_eq!(profile["shop_name"], "Bean");
    }

    #[test_log::test(tokio::test)]
    async fn test_check_auth_status_logs_out_on_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/profile")
            .with_status(500)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_token(&jwt_with_exp(u32::MAX as u64)));
        let client = client_for(&server.url(), store.clone());

        assert_eq!(check_auth_status(&client).await.unwrap(), None);
        assert_eq!(store.get_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_check_auth_status_skips_network_without_session() {
        let server = mockito::Server::new_async().await;
        let client = client_for(&server.url(), Arc::new(MemoryStore::new()));
        assert_eq!(check_auth_status(&client).await.unwrap(), None);
    }
}
