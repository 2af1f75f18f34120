use log::{debug, warn};

use super::types::{AuthSession, Credentials, Registration};
use super::unwrap_data;
use crate::config::endpoints;
use crate::http::{ApiClient, ApiError, RequestOptions};
use crate::store::mask_token;

/// Auth failures in the terms a shop owner understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// HTTP 400
    InvalidInput,
    /// HTTP 401
    InvalidCredentials,
    /// HTTP 409
    EmailTaken,
    /// HTTP 429
    TooManyAttempts,
    /// The server could not be reached.
    Unreachable,
    /// The session was accepted but could not be saved locally.
    Storage(String),
    Other(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidInput => write!(f, "Invalid data. Please check your input."),
            AuthError::InvalidCredentials => write!(f, "Incorrect email or password."),
            AuthError::EmailTaken => write!(f, "This email address is already registered."),
            AuthError::TooManyAttempts => {
                write!(f, "Too many attempts. Please try again later.")
            }
            AuthError::Unreachable => write!(
                f,
                "Unable to reach the server. Please check your internet connection."
            ),
            AuthError::Storage(msg) => write!(f, "Failed to save the session: {}", msg),
            AuthError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ApiError> for AuthError {
    fn from(error: ApiError) -> Self {
        if error.is_network() {
            return AuthError::Unreachable;
        }
        match error.status {
            400 => AuthError::InvalidInput,
            401 => AuthError::InvalidCredentials,
            409 => AuthError::EmailTaken,
            429 => AuthError::TooManyAttempts,
            _ if error.message.is_empty() => {
                AuthError::Other("Authentication failed.".to_string())
            }
            _ => AuthError::Other(error.message),
        }
    }
}

/// Register, login and logout. Successful sign-ins persist the token and shop info.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    #[tracing::instrument(skip(self, registration))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, AuthError> {
        debug!("Registering shop {:?}", registration.shop_name);
        self.sign_in(endpoints::REGISTER, registration).await
    }

    #[tracing::instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        debug!("Logging in as {}", credentials.email);
        self.sign_in(endpoints::LOGIN, credentials).await
    }

    /// Tells the backend, then forgets the local session whatever it said.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> anyhow::Result<()> {
        if let Err(e) = self
            .client
            .request(endpoints::LOGOUT, RequestOptions::post())
            .await
        {
            warn!("Logout request failed, clearing local session anyway: {}", e);
        }
        self.client.store().clear()?;
        debug!("Local session cleared");
        Ok(())
    }

    async fn sign_in<P: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<AuthSession, AuthError> {
        let options = RequestOptions::post()
            .json(payload)
            .map_err(|e| AuthError::Other(format!("Failed to encode request: {}", e)))?;

        let response = self.client.request(endpoint, options).await?;
        let session: AuthSession = serde_json::from_value(unwrap_data(response))
            .map_err(|e| AuthError::Other(format!("Unexpected response from server: {}", e)))?;

        if let Some(token) = session.token.as_deref() {
            let store = self.client.store();
            let saved = store
                .set_token(token)
                .and_then(|_| store.set_shop_info(&session.shop_info()));
            if let Err(e) = saved {
                // Never leave a token behind without its shop info.
                if let Err(clear_err) = store.clear() {
                    warn!("Failed to roll back partial session: {:#}", clear_err);
                }
                return Err(AuthError::Storage(format!("{:#}", e)));
            }
            debug!("Stored token {}", mask_token(token));
        }

        Ok(session)
    }
}
