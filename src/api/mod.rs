//! Typed backend operations built on top of [`crate::http::ApiClient`].
//!
//! Every backend success response is wrapped as `{status, message, data}`;
//! these helpers unwrap `data` so callers see the payload directly.

mod auth;
mod dashboard;
mod qr;
mod types;

use serde_json::Value;

pub use auth::{AuthApi, AuthError};
pub use dashboard::DashboardApi;
pub use qr::QrApi;
pub use types::{AuthSession, Credentials, QrCode, Registration};

/// Returns the `data` member of an envelope when it carries something,
/// otherwise the value itself.
pub fn unwrap_data(value: Value) -> Value {
    if let Some(data) = value.get("data").filter(|data| is_truthy(data)) {
        return data.clone();
    }
    value
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
