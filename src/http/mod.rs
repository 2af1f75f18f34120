//! Backend request client with retry logic and error classification.

mod client;
mod request;
mod retry;
mod transport;

pub use client::ApiClient;
pub use request::RequestOptions;
pub use retry::{
    ApiError, ErrorOrigin, NETWORK_MESSAGE, STATUS_NETWORK, STATUS_TIMEOUT, TIMEOUT_MESSAGE,
    backoff_delay,
};
pub use transport::{ApiRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
