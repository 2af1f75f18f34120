//! Per-call request options.

use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Caller overrides for one logical call. Everything defaults to a plain GET.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self::default().method(Method::POST)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Uses an already serialized payload as the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `payload` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> serde_json::Result<Self> {
        Ok(self.body(serde_json::to_string(payload)?))
    }

    /// Overrides the configured per-attempt deadline for this call only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
