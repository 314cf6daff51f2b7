use std::time::Duration;

use tokio::time;
use tracing::{error, info, warn};

use crate::api::CatalogClient;
use crate::models::SharedCatalog;

/// Worker that periodically re-fetches the odds catalog
pub struct CatalogRefresherWorker {
    client: CatalogClient,
    catalog: SharedCatalog,
    refresh_interval: Duration,
}

impl CatalogRefresherWorker {
    /// Create a new catalog refresher worker
    pub fn new(client: CatalogClient, catalog: SharedCatalog, refresh_interval_secs: u64) -> Self {
        Self {
            client,
            catalog,
            refresh_interval: Duration::from_secs(refresh_interval_secs),
        }
    }

    /// Run the worker loop
    pub async fn run(&self) {
        info!(
            "Catalog refresher started (interval: {:?})",
            self.refresh_interval
        );

        // Run initial refresh immediately
        self.refresh().await;

        let mut interval = time::interval(self.refresh_interval);
        interval.tick().await; // Skip first tick (already ran)

        loop {
            interval.tick().await;
            self.refresh().await;
        }
    }

    /// Fetch a new snapshot and swap it in whole.
    ///
    /// Selections already on the slip keep their locked prices.
    pub async fn refresh(&self) {
        match self.client.fetch().await {
            Ok(snapshot) => {
                let count = snapshot.len();
                let live = snapshot.matches.iter().filter(|m| m.is_live()).count();

                *self.catalog.write().await = snapshot;

                info!("Catalog refreshed: {} matches ({} live)", count, live);
            }
            Err(e) => {
                error!("Failed to refresh catalog: {}", e);
                warn!("Keeping previous snapshot, will retry on next interval");
            }
        }
    }
}
