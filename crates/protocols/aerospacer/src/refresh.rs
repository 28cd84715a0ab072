//! Background Ledger Refresh
//!
//! A caller-owned task that rebuilds the ordered ledger on an interval and
//! publishes each result on a watch channel. Only the most recent snapshot
//! is retained. A failed cycle is logged and the previous snapshot stays
//! current.

use std::sync::Arc;
use std::time::Duration;

use aerospacer_core::{AccountId, AppConfig, ProtocolError, Result};
use aerospacer_rpc::AccountSource;
use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::fetch::fetch_positions;
use crate::ratio::RatioParams;
use crate::sorted::sort;
use crate::state::LedgerSnapshot;

/// Source of the collateral's USD price for each refresh
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn price_usd(&self) -> Result<f64>;
}

/// Constant price
#[derive(Debug, Clone, Copy)]
pub struct FixedPrice(pub f64);

#[async_trait]
impl PriceFeed for FixedPrice {
    async fn price_usd(&self) -> Result<f64> {
        Ok(self.0)
    }
}

/// Price cell updated by whoever talks to the oracle.
///
/// Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct SharedPrice {
    inner: Arc<RwLock<Option<f64>>>,
}

impl SharedPrice {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, price_usd: f64) {
        *self.inner.write().await = Some(price_usd);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl PriceFeed for SharedPrice {
    async fn price_usd(&self) -> Result<f64> {
        let price = *self.inner.read().await;
        price.ok_or_else(|| {
            ProtocolError::StateUnavailable {
                reason: "no price published yet".to_string(),
            }
            .into()
        })
    }
}

/// Refresh parameters
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub program: AccountId,
    pub denom: String,
    pub threshold: u64,
    pub ratio_params: RatioParams,
    pub interval: Duration,
}

impl RefreshConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            program: config.protocol_program()?,
            denom: config.collateral_denom.clone(),
            threshold: config.liquidation_threshold,
            ratio_params: RatioParams::from_config(config),
            interval: config.refresh_interval(),
        })
    }
}

/// Build one ordered snapshot
pub async fn refresh_once(
    source: &dyn AccountSource,
    price_feed: &dyn PriceFeed,
    config: &RefreshConfig,
) -> Result<LedgerSnapshot> {
    let price_usd = price_feed.price_usd().await?;
    let positions = fetch_positions(
        source,
        &config.program,
        &config.denom,
        price_usd,
        &config.ratio_params,
    )
    .await?;

    Ok(LedgerSnapshot::from_positions(
        &config.denom,
        sort(positions),
        price_usd,
        config.threshold,
        &config.ratio_params,
    ))
}

pub struct RefreshTask;

impl RefreshTask {
    /// Start refreshing immediately, then on every interval tick
    pub fn spawn(
        source: Arc<dyn AccountSource>,
        price_feed: Arc<dyn PriceFeed>,
        config: RefreshConfig,
    ) -> RefreshHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                match refresh_once(source.as_ref(), price_feed.as_ref(), &config).await {
                    Ok(snapshot) => {
                        tracing::debug!(
                            denom = %config.denom,
                            positions = snapshot.len(),
                            liquidatable = snapshot.liquidatable,
                            "Ledger refreshed"
                        );
                        if snapshot_tx.send(Some(Arc::new(snapshot))).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(denom = %config.denom, error = %e, "Ledger refresh failed, keeping previous snapshot");
                    }
                }
            }
            tracing::debug!("Ledger refresh task stopped");
        });

        RefreshHandle {
            snapshots: snapshot_rx,
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Owner's handle on a running [`RefreshTask`]
pub struct RefreshHandle {
    snapshots: watch::Receiver<Option<Arc<LedgerSnapshot>>>,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RefreshHandle {
    /// Receiver of every published snapshot; `None` until the first success
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<LedgerSnapshot>>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Option<Arc<LedgerSnapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Stop the task and wait for it to exit
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "Ledger refresh task ended abnormally");
        }
    }
}
