use blockchain::{amount::lamports_to_sol, HoldingsFetcher, NetworkRpc, TokenHolding};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::TokenService;

/// Balances and holdings of one wallet at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsSnapshot {
    pub owner: String,
    pub sol_balance: Decimal,
    pub holdings: Vec<TokenHolding>,
    /// `None` until the first refresh lands
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl HoldingsSnapshot {
    pub fn empty(owner: &Pubkey) -> Self {
        Self {
            owner: owner.to_string(),
            sol_balance: Decimal::ZERO,
            holdings: Vec::new(),
            refreshed_at: None,
        }
    }
}

/// Polls one wallet's balance and holdings and publishes each result as a
/// fresh snapshot.
pub struct BalanceMonitor {
    rpc: Arc<dyn NetworkRpc>,
    fetcher: Arc<HoldingsFetcher>,
    owner: Pubkey,
    interval: Duration,
    publisher: watch::Sender<Arc<HoldingsSnapshot>>,
}

impl BalanceMonitor {
    pub fn new(
        rpc: Arc<dyn NetworkRpc>,
        fetcher: Arc<HoldingsFetcher>,
        owner: Pubkey,
        interval: Duration,
    ) -> Result<(Self, watch::Receiver<Arc<HoldingsSnapshot>>)> {
        if interval.is_zero() {
            return Err(Error::Config(
                "Balance poll interval must be greater than zero".to_string(),
            ));
        }

        let (publisher, receiver) = watch::channel(Arc::new(HoldingsSnapshot::empty(&owner)));
        let monitor = Self {
            rpc,
            fetcher,
            owner,
            interval,
            publisher,
        };
        Ok((monitor, receiver))
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<HoldingsSnapshot>> {
        self.publisher.subscribe()
    }

    /// Fetch once and replace the published snapshot.
    ///
    /// A failed balance query keeps the previous snapshot in place.
    pub async fn refresh_once(&self) -> Result<Arc<HoldingsSnapshot>> {
        let lamports = self.rpc.get_balance(&self.owner).await?;
        let holdings = self.fetcher.list_holdings(&self.owner).await;

        let snapshot = Arc::new(HoldingsSnapshot {
            owner: self.owner.to_string(),
            sol_balance: lamports_to_sol(lamports),
            holdings,
            refreshed_at: Some(Utc::now()),
        });
        self.publisher.send_replace(snapshot.clone());

        debug!(
            "Snapshot for {}: {} SOL, {} holding(s)",
            self.owner,
            snapshot.sol_balance,
            snapshot.holdings.len()
        );
        Ok(snapshot)
    }

    /// Poll in the background until the handle is shut down or dropped
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown, mut stop) = watch::channel(false);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            info!("Balance monitor for {} started ({:?} interval)", self.owner, interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh_once().await {
                            warn!("Balance refresh for {} failed: {}", self.owner, e);
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Balance monitor for {} stopped", self.owner);
        });

        MonitorHandle { shutdown, task }
    }
}

/// Owner of a running monitor. Dropping it stops the polling loop.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop and wait for it to exit
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.send_replace(true);
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Balance monitor task failed: {}", e)))
    }
}

impl TokenService {
    /// Monitor for the connected wallet at the configured poll interval
    pub fn monitor_for_wallet(&self) -> Result<(BalanceMonitor, watch::Receiver<Arc<HoldingsSnapshot>>)> {
        let owner = self.require_wallet()?;
        BalanceMonitor::new(
            self.rpc.clone(),
            self.holdings.clone(),
            owner,
            self.settings.balance_poll_interval,
        )
    }
}
