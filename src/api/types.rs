use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::store::ShopInfo;

/// Login payload.
#[derive(Serialize, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration payload for a new shop.
#[derive(Serialize, Clone, PartialEq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub shop_name: String,
    pub shop_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("shop_name", &self.shop_name)
            .field("shop_type", &self.shop_type)
            .field("device_token", &self.device_token)
            .finish()
    }
}

/// What login and register hand back.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct AuthSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub shop_id: String,
    #[serde(default)]
    pub shop_type: String,
    #[serde(default)]
    pub shop_name: String,
}

impl AuthSession {
    pub fn shop_info(&self) -> ShopInfo {
        ShopInfo {
            shop_id: self.shop_id.clone(),
            shop_type: self.shop_type.clone(),
            shop_name: self.shop_name.clone(),
        }
    }
}

/// A shop's feedback QR code.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct QrCode {
    /// Base64-encoded PNG.
    pub qr_code: String,
    /// Feedback form URL encoded in the image; only returned when fetching by shop id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub shop_type: String,
    #[serde(default)]
    pub shop_name: String,
}

impl QrCode {
    /// Decodes the PNG image.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let encoded = self
            .qr_code
            .strip_prefix("data:image/png;base64,")
            .unwrap_or(&self.qr_code);
        STANDARD
            .decode(encoded.trim())
            .context("QR code is not valid base64")
    }
}
