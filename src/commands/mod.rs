//! Command handlers behind the CLI. Each returns the JSON document to print.

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::{Value, json};
use std::path::Path;

use crate::{
    api::{AuthSession, Credentials, QrCode, Registration},
    runtime::Runtime,
    session::check_auth_status,
};

pub mod config;

pub use config::{Services, Settings};

#[tracing::instrument(skip(services, password))]
pub async fn login(services: &Services, email: &str, password: &str) -> Result<Value> {
    let credentials = Credentials {
        email: email.trim().to_lowercase(),
        password: password.to_string(),
    };
    let session = services.auth().login(&credentials).await?;
    Ok(session_summary("Logged in", &session))
}

#[tracing::instrument(skip(services, registration))]
pub async fn register(services: &Services, registration: Registration) -> Result<Value> {
    let registration = Registration {
        email: registration.email.trim().to_lowercase(),
        shop_name: registration.shop_name.trim().to_string(),
        shop_type: registration.shop_type.trim().to_string(),
        ..registration
    };
    let session = services.auth().register(&registration).await?;
    Ok(session_summary("Registered", &session))
}

#[tracing::instrument(skip(services))]
pub async fn logout(services: &Services) -> Result<Value> {
    services.auth().logout().await?;
    Ok(json!({ "message": "Logged out locally" }))
}

/// Local token check followed by a profile round-trip.
#[tracing::instrument(skip(services))]
pub async fn status(services: &Services) -> Result<Value> {
    let profile = check_auth_status(&services.client).await?;
    let shop = services.store().get_shop_info().unwrap_or_else(|e| {
        warn!("Ignoring unreadable stored shop info: {:#}", e);
        None
    });
    Ok(json!({
        "authenticated": profile.is_some(),
        "shop": shop,
        "profile": profile,
    }))
}

#[tracing::instrument(skip(services))]
pub async fn dashboard(services: &Services) -> Result<Value> {
    Ok(services.dashboard().dashboard().await?)
}

#[tracing::instrument(skip(services))]
pub async fn profile(services: &Services) -> Result<Value> {
    Ok(services.dashboard().profile().await?)
}

#[tracing::instrument(skip(services, runtime))]
pub async fn qr_generate<R: Runtime>(
    services: &Services,
    runtime: &R,
    output: Option<&Path>,
) -> Result<Value> {
    let qr = services.qr().generate().await?;
    qr_summary(runtime, qr, output)
}

#[tracing::instrument(skip(services, runtime))]
pub async fn qr_get<R: Runtime>(
    services: &Services,
    runtime: &R,
    shop_id: &str,
    output: Option<&Path>,
) -> Result<Value> {
    let qr = services.qr().get(shop_id).await?;
    qr_summary(runtime, qr, output)
}

/// Session details fit for printing. The token itself stays in the store.
fn session_summary(message: &str, session: &AuthSession) -> Value {
    json!({
        "message": message,
        "shop_id": session.shop_id,
        "shop_type": session.shop_type,
        "shop_name": session.shop_name,
        "token_stored": session.token.is_some(),
    })
}

/// Writes the PNG when asked to; otherwise returns the base64 payload as is.
fn qr_summary<R: Runtime>(runtime: &R, qr: QrCode, output: Option<&Path>) -> Result<Value> {
    let Some(path) = output else {
        return Ok(serde_json::to_value(&qr)?);
    };

    let png = qr.png_bytes()?;
    runtime
        .write(path, &png)
        .with_context(|| format!("Failed to save QR code to {}", path.display()))?;
    info!("Saved QR code to {}", path.display());

    Ok(json!({
        "saved_to": path.display().to_string(),
        "bytes": png.len(),
        "url": qr.url,
        "shop_type": qr.shop_type,
        "shop_name": qr.shop_name,
    }))
}
