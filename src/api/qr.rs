use super::types::QrCode;
use super::unwrap_data;
use crate::config::endpoints;
use crate::http::{ApiClient, ApiError, RequestOptions};

/// Feedback QR code operations.
#[derive(Clone)]
pub struct QrApi {
    client: ApiClient,
}

impl QrApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Generates a QR code for the signed-in shop. Requires a stored token.
    #[tracing::instrument(skip(self))]
    pub async fn generate(&self) -> Result<QrCode, ApiError> {
        let (status, response) = self
            .client
            .request_with_status(endpoints::GENERATE_QR, RequestOptions::post())
            .await?;
        decode(status, response)
    }

    /// Fetches the public QR code of any shop.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, shop_id: &str) -> Result<QrCode, ApiError> {
        let shop_id = shop_id.trim();
        if shop_id.is_empty() || shop_id.contains(['/', '?', '#']) {
            return Err(ApiError::invalid_request(format!(
                "invalid shop id {:?}",
                shop_id
            )));
        }

        let endpoint = format!("{}/{}", endpoints::GET_QR, shop_id);
        let (status, response) = self
            .client
            .request_with_status(&endpoint, RequestOptions::get())
            .await?;
        decode(status, response)
    }
}

fn decode(status: u16, response: serde_json::Value) -> Result<QrCode, ApiError> {
    serde_json::from_value(unwrap_data(response)).map_err(|e| ApiError::invalid_response(status, e))
}
