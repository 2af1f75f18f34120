//! Durable credential storage.
//!
//! The store holds at most one bearer token plus a small shop-info blob used
//! for display. The request client only ever reads the token; the auth flows
//! write and clear both.

mod file;
mod memory;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::storage;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Shop identity returned by login/register, kept alongside the token.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ShopInfo {
    #[serde(default)]
    pub shop_id: String,
    #[serde(default)]
    pub shop_type: String,
    #[serde(default)]
    pub shop_name: String,
}

#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// The stored token without surrounding whitespace. Blank counts as absent.
    fn get_token(&self) -> Result<Option<String>> {
        Ok(self
            .get(storage::AUTH_TOKEN)?
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty()))
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.set(storage::AUTH_TOKEN, token)
    }

    fn get_shop_info(&self) -> Result<Option<ShopInfo>> {
        match self.get(storage::SHOP_INFO)? {
            Some(raw) => {
                let info = serde_json::from_str(&raw).context("Failed to parse stored shop info")?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    fn set_shop_info(&self, info: &ShopInfo) -> Result<()> {
        let raw = serde_json::to_string(info)?;
        self.set(storage::SHOP_INFO, &raw)
    }

    /// Removes the token and the shop info.
    fn clear(&self) -> Result<()> {
        self.remove(storage::AUTH_TOKEN)?;
        self.remove(storage::SHOP_INFO)
    }
}

/// Masks a token for log output, keeping only a short prefix and suffix.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
