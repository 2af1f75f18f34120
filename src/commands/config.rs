use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    api::{AuthApi, DashboardApi, QrApi},
    config::ApiConfig,
    http::{ApiClient, ReqwestTransport, Transport},
    runtime::Runtime,
    store::{CredentialStore, FileStore},
};

/// Command-line overrides on top of the detected configuration.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<usize>,
    pub store_dir: Option<PathBuf>,
}

/// Everything a command needs, wired once per process.
pub struct Services {
    pub client: ApiClient,
}

impl Services {
    pub fn new<R: Runtime + 'static>(runtime: R, settings: Settings) -> Result<Self> {
        let transport = ReqwestTransport::with_default_client()?;
        Self::with_transport(runtime, settings, Arc::new(transport))
    }

    pub fn with_transport<R: Runtime + 'static>(
        runtime: R,
        settings: Settings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let config = resolve_config(&runtime, &settings)?;
        debug!(
            "Using API at {} (timeout {:?}, {} attempts)",
            config.base_url(),
            config.timeout(),
            config.retries()
        );

        let store: Arc<dyn CredentialStore> = match settings.store_dir {
            Some(dir) => Arc::new(FileStore::new(runtime, dir)),
            None => Arc::new(FileStore::in_config_dir(runtime)?),
        };

        Ok(Self {
            client: ApiClient::new(config, transport, store),
        })
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.client.clone())
    }

    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.client.clone())
    }

    pub fn qr(&self) -> QrApi {
        QrApi::new(self.client.clone())
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.client.store()
    }
}

fn resolve_config<R: Runtime>(runtime: &R, settings: &Settings) -> Result<ApiConfig> {
    let detected = ApiConfig::detect(runtime)?;

    let mut config = match &settings.api_url {
        Some(url) => ApiConfig::new(url.as_str())
            .with_timeout(detected.timeout())
            .with_retries(detected.retries()),
        None => detected,
    };
    if let Some(ms) = settings.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    if let Some(retries) = settings.retries {
        config = config.with_retries(retries);
    }
    Ok(config)
}
