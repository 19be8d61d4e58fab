//! Startup orchestration.
//!
//! Builds the runtime object graph from a validated config:
//! store → maintenance worker → transports → fetcher → platform client.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::error::{FetchError, FetchResult};
use crate::guest::fetcher::GuestFetcher;
use crate::guest::maintenance::MaintenanceScheduler;
use crate::guest::store::{CredentialStore, MemoryCredentialStore};
use crate::http::transport::{ReqwestTransport, Transport};
use crate::platform::PlatformClient;

/// Everything a binary needs to serve lookups.
pub struct Services {
    pub platform: Arc<PlatformClient>,
    pub maintenance: MaintenanceScheduler,
    pub maintenance_worker: JoinHandle<()>,
}

impl Services {
    /// Wire up services with the in-memory credential store.
    pub fn build(config: &ServiceConfig, shutdown: broadcast::Receiver<()>) -> FetchResult<Self> {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        Self::build_with_store(config, store, shutdown)
    }

    pub fn build_with_store(
        config: &ServiceConfig,
        store: Arc<dyn CredentialStore>,
        shutdown: broadcast::Receiver<()>,
    ) -> FetchResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.timeouts)?);
        let (maintenance, maintenance_worker) =
            MaintenanceScheduler::spawn(store.clone(), config.maintenance.queue_capacity, shutdown);

        let mut fetcher = GuestFetcher::new(
            &config.upstream,
            &config.guest,
            store,
            transport.clone(),
            maintenance.clone(),
        )?;

        if config.accelerator.enabled {
            let proxy_url = config.accelerator.proxy_url.as_deref().ok_or_else(|| {
                FetchError::InvalidRequest("accelerator enabled without proxy_url".to_string())
            })?;
            let accelerator = ReqwestTransport::with_egress_proxy(proxy_url, &config.timeouts)?;
            fetcher = fetcher.with_accelerator(Arc::new(accelerator));
            tracing::info!(proxy = %proxy_url, "Accelerator configured");
        }

        let platform = PlatformClient::new(Arc::new(fetcher), transport, &config.upstream);
        Ok(Self {
            platform: Arc::new(platform),
            maintenance,
            maintenance_worker,
        })
    }

    /// Wait for the maintenance worker to drain, at most `timeout`.
    pub async fn drain(self, timeout: Duration) {
        drop(self.platform);
        drop(self.maintenance);
        match tokio::time::timeout(timeout, self.maintenance_worker).await {
            Ok(Ok(())) => tracing::info!("Maintenance queue drained"),
            Ok(Err(e)) => tracing::error!(error = %e, "Maintenance worker panicked"),
            Err(_) => tracing::warn!(?timeout, "Maintenance drain timed out"),
        }
    }
}
