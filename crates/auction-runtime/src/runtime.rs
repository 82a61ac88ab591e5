//! Wiring of store, registry, sweeper and HTTP service.

use crate::clock::MonotonicClock;
use crate::config::RuntimeConfig;
use crate::registry::AuctionRegistry;
use crate::seeds::read_seed;
use crate::service::{build_router, serve};
use crate::sweep::run_sweeper;
use anyhow::{Context, Result};
use axum::Router;
use ca_01_ledger::{InMemoryLedgerStore, JsonFileLedgerStore, LedgerStore};
use ca_04_live_gateway::StaticCredentials;
use shared_bus::InMemoryEventBus;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct AuctionRuntime {
    config: RuntimeConfig,
    registry: Arc<AuctionRegistry>,
    credentials: Arc<StaticCredentials>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl AuctionRuntime {
    /// Open the configured store: JSON files under `data_dir`, otherwise
    /// memory only.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let store: Arc<dyn LedgerStore> = match &config.data_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Using JSON file ledger store");
                Arc::new(
                    JsonFileLedgerStore::open(dir)
                        .with_context(|| format!("cannot open ledger store at {}", dir.display()))?,
                )
            }
            None => {
                warn!("No CA_DATA_DIR set, ledgers are kept in memory only");
                Arc::new(InMemoryLedgerStore::new())
            }
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: RuntimeConfig, store: Arc<dyn LedgerStore>) -> Self {
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.event_capacity));
        let registry = Arc::new(AuctionRegistry::new(
            bus,
            store,
            Arc::new(MonotonicClock::new()),
        ));

        let credentials = StaticCredentials::new(config.admin_key.clone());
        for entry in &config.team_tokens {
            credentials.insert_team_token(
                entry.auction_id.clone(),
                entry.team_id.clone(),
                entry.token.clone(),
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            registry,
            credentials: Arc::new(credentials),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn registry(&self) -> &Arc<AuctionRegistry> {
        &self.registry
    }

    /// Resume stored auctions, then start any seeded auction not yet running.
    pub fn load_auctions(&self) -> Result<usize> {
        let resumed = self
            .registry
            .resume_stored()
            .context("failed to resume stored auctions")?;
        if resumed > 0 {
            info!(resumed, "Resumed stored auctions");
        }

        let mut started = 0;
        for path in &self.config.seed_files {
            let seed = read_seed(path)?;
            if self.registry.get(&seed.id).is_ok() {
                info!(auction_id = %seed.id, "Auction already running, seed ignored");
                continue;
            }
            self.registry
                .load_seed(seed)
                .with_context(|| format!("cannot load auction from {}", path.display()))?;
            started += 1;
        }
        Ok(resumed + started)
    }

    pub fn router(&self) -> Router {
        build_router(
            self.registry.clone(),
            self.credentials.clone(),
            self.config.gateway.clone(),
        )
    }

    /// Run the sweeper and the HTTP service until [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<()> {
        let sweeper = tokio::spawn(run_sweeper(
            self.registry.clone(),
            self.config.sweep_interval(),
            self.shutdown_rx.clone(),
        ));

        let served = serve(
            &self.config.listen_addr(),
            self.router(),
            self.shutdown_rx.clone(),
        )
        .await;

        // The server may have failed on its own; stop the sweeper too.
        self.shutdown();
        if let Err(e) = sweeper.await {
            error!(error = %e, "Trade sweeper task failed");
        }
        served
    }

    pub fn shutdown(&self) {
        if self.shutdown_tx.send(true).is_err() {
            warn!("Shutdown signalled with no listeners");
        }
    }
}
