//! Client configuration, fixed once at startup.

use anyhow::{Context, Result};
use log::debug;
use std::time::Duration;

use crate::runtime::Runtime;

/// Backend origin used when running against a local development server.
pub const LOCAL_BASE_URL: &str = "http://127.0.0.1:5000";

/// Backend origin used everywhere else.
pub const PRODUCTION_BASE_URL: &str = "https://api-reputation-guardian.vercel.app";

/// Per-attempt deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Maximum number of attempts per logical call.
pub const DEFAULT_RETRIES: usize = 3;

pub const ENV_API_URL: &str = "REPGUARD_API_URL";
pub const ENV_ENVIRONMENT: &str = "REPGUARD_ENV";
pub const ENV_TIMEOUT_MS: &str = "REPGUARD_TIMEOUT_MS";
pub const ENV_RETRIES: &str = "REPGUARD_RETRIES";

/// Backend endpoint paths, relative to the base URL.
pub mod endpoints {
    pub const REGISTER: &str = "/register";
    pub const LOGIN: &str = "/login";
    pub const LOGOUT: &str = "/logout";
    pub const DASHBOARD: &str = "/dashboard";
    pub const PROFILE: &str = "/profile";
    pub const GENERATE_QR: &str = "/generate-qr";
    pub const GET_QR: &str = "/qr";
}

/// Keys used in the credential store.
pub mod storage {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const SHOP_INFO: &str = "shop_info";
}

/// Immutable request client configuration.
///
/// Built once and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
    retries: usize,
    backoff_unit: Duration,
}

impl ApiConfig {
    /// Creates a configuration with the default timeout, retry count and backoff.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retries: DEFAULT_RETRIES,
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Picks the base URL and numeric settings from the environment.
    ///
    /// `REPGUARD_API_URL` wins; otherwise `REPGUARD_ENV=development|local`
    /// selects the local server and anything else the production origin.
    pub fn detect<R: Runtime + ?Sized>(runtime: &R) -> Result<Self> {
        let base_url = match runtime.env_var(ENV_API_URL) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => match runtime.env_var(ENV_ENVIRONMENT).as_deref() {
                Ok("development") | Ok("local") => LOCAL_BASE_URL.to_string(),
                _ => PRODUCTION_BASE_URL.to_string(),
            },
        };

        let mut config = Self::new(base_url);

        if let Ok(raw) = runtime.env_var(ENV_TIMEOUT_MS) {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_TIMEOUT_MS, raw))?;
            config = config.with_timeout(Duration::from_millis(ms));
        }

        if let Ok(raw) = runtime.env_var(ENV_RETRIES) {
            let retries: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_RETRIES, raw))?;
            config = config.with_retries(retries);
        }

        debug!("Detected API configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the attempt budget. Zero is treated as a single attempt.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Sets the unit the exponential backoff is multiplied by (one second by default).
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Resolves an endpoint path against the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}
