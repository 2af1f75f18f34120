//! Backend client with bearer-token attachment, per-attempt deadlines and
//! exponential backoff.

use log::{debug, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::request::RequestOptions;
use super::retry::{ApiError, backoff_delay};
use super::transport::{ApiRequest, HttpResponse, Transport, TransportError};
use crate::config::ApiConfig;
use crate::store::CredentialStore;

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";

/// Issues calls against the configured backend origin.
///
/// Cloning is cheap; clones share configuration, transport and store.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ApiConfig>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(
        config: ApiConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            store,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The credential store the client reads its token from.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Performs one logical call and returns the parsed JSON body unchanged.
    ///
    /// Success bodies are not unwrapped; an empty body comes back as `null`.
    #[tracing::instrument(skip(self, options))]
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.request_with_status(endpoint, options)
            .await
            .map(|(_, value)| value)
    }

    /// Same as [`ApiClient::request`] but deserializes the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let (status, value) = self.request_with_status(endpoint, options).await?;
        serde_json::from_value(value).map_err(|e| ApiError::invalid_response(status, e))
    }

    /// Same as [`ApiClient::request`] but also returns the success status.
    pub async fn request_with_status(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<(u16, Value), ApiError> {
        let timeout = options.timeout.unwrap_or(self.config.timeout());
        let request = self.prepare(endpoint, options);
        let retries = self.config.retries();
        let operation = format!("{} {}", request.method, endpoint);

        let mut last_error = None;

        for attempt in 1..=retries {
            match self.attempt(&request, timeout).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() {
                        debug!("{}: non-retryable error: {}", operation, e);
                        return Err(e);
                    }

                    if attempt < retries {
                        let delay = backoff_delay(attempt, self.config.backoff_unit());
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                            operation,
                            attempt,
                            retries,
                            e,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!("{}: attempt {}/{} failed ({})", operation, attempt, retries, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        // `retries` is at least one, so the loop always records an error.
        Err(last_error.unwrap_or_else(|| ApiError::network("no attempt was made")))
    }

    /// Builds the absolute URL and the merged header set for one call.
    fn prepare(&self, endpoint: &str, options: RequestOptions) -> ApiRequest {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        for (name, value) in options.headers {
            headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(&name));
            headers.insert(name, value);
        }

        let mut request = ApiRequest {
            method: options.method.unwrap_or(Method::GET),
            url: self.config.url_for(endpoint),
            headers,
            body: options.body,
        };

        // A blank Authorization header counts as not supplied.
        if request
            .header(AUTHORIZATION)
            .is_none_or(|value| value.trim().is_empty())
        {
            request
                .headers
                .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
            match self.store.get_token() {
                Ok(Some(token)) => {
                    request
                        .headers
                        .insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read stored token, sending without it: {:#}", e),
            }
        }

        request
    }

    /// One network attempt under the given deadline.
    async fn attempt(
        &self,
        request: &ApiRequest,
        timeout: Duration,
    ) -> Result<(u16, Value), ApiError> {
        let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(TransportError::Network(detail))) => return Err(ApiError::network(detail)),
            Ok(Err(TransportError::InvalidRequest(detail))) => {
                return Err(ApiError::invalid_request(detail));
            }
            // Dropping the transport future cancels the in-flight exchange.
            Err(_) => return Err(ApiError::timeout()),
        };

        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body));
        }

        parse_body(&response).map(|value| (response.status, value))
    }
}

fn parse_body(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::invalid_response(response.status, e))
}
