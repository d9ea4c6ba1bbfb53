//! Per-family balance adapters
//!
//! Every adapter has the same shape: given the chain, the compatible addresses,
//! the assets to watch and a chain client, it starts one or more background tasks
//! that push canonical `BalanceItem`s into a `BalanceSink`, and returns the
//! `SubscriptionHandle` owning those tasks. An adapter that cannot start returns an
//! `AdapterError` and is omitted by the caller.

pub mod bitcoin;
pub mod cardano;
pub mod evm;
pub mod substrate;
pub mod ton;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use balance_core::{BalanceConfig, BalanceItem, BalanceState, ChainAsset, ChainInfo, TxTypeHint};
use tokio::time::{interval, MissedTickBehavior};

use crate::handle::SubscriptionHandle;
use crate::sink::BalanceSink;

/// Everything an adapter needs besides its chain client
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub chain: Arc<ChainInfo>,
    pub addresses: Vec<String>,
    pub assets: Vec<ChainAsset>,
    pub sink: BalanceSink,
    pub config: Arc<BalanceConfig>,
    pub tx_hint: Option<TxTypeHint>,
}

impl AdapterContext {
    pub fn chain_slug(&self) -> &str {
        &self.chain.slug
    }

    /// Handle label, e.g. `polkadot/system`
    pub fn label(&self, adapter: &str) -> String {
        format!("{}/{}", self.chain.slug, adapter)
    }

    /// Copy of this context restricted to `assets`
    pub fn with_assets(&self, assets: Vec<ChainAsset>) -> Self {
        Self {
            assets,
            ..self.clone()
        }
    }

    /// Copy of this context whose sink is also gated on `handle`
    pub fn scoped(&self, handle: &SubscriptionHandle) -> Self {
        Self {
            sink: self.sink.scoped(handle),
            ..self.clone()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }
}

/// Zero-balance records for every (address, asset) pair
pub(crate) fn zero_items(
    addresses: &[String],
    assets: &[ChainAsset],
    state: BalanceState,
) -> Vec<BalanceItem> {
    assets
        .iter()
        .flat_map(|asset| {
            addresses
                .iter()
                .map(move |address| BalanceItem::zero(address.clone(), asset.slug.clone(), state))
        })
        .collect()
}

/// Split assets into (supported, unsupported) by a predicate
pub(crate) fn split_assets(
    assets: &[ChainAsset],
    supported: impl Fn(&ChainAsset) -> bool,
) -> (Vec<ChainAsset>, Vec<ChainAsset>) {
    assets.iter().cloned().partition(|asset| supported(asset))
}

/// Run `poll` immediately and then every `every`, emitting its results.
///
/// The task is owned by `handle`. It stops once the sink is closed; results of a
/// cycle that finishes after cancellation are dropped by the sink.
pub(crate) fn spawn_poller<F, Fut>(
    handle: &SubscriptionHandle,
    sink: BalanceSink,
    every: Duration,
    mut poll: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Vec<BalanceItem>> + Send + 'static,
{
    let label = handle.label().to_string();
    let every = every.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if sink.is_closed() {
                break;
            }

            let items = poll().await;
            if !sink.emit(items) {
                break;
            }
        }

        tracing::debug!(label = %label, "Poller stopped");
    });

    handle.add_task(task);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for adapter tests

    use super::*;
    use balance_core::{AssetMetadata, AssetType, Amount, TokenSlug};

    use crate::sink::BalanceStream;

    pub fn asset(slug: &str, chain: &str, asset_type: AssetType, ed: u64) -> ChainAsset {
        ChainAsset {
            slug: TokenSlug::new(slug),
            origin_chain: chain.to_string(),
            asset_type,
            symbol: slug.rsplit('-').next().unwrap_or(slug).to_string(),
            decimals: 10,
            min_amount: Amount::from(ed),
            metadata: AssetMetadata::default(),
        }
    }

    pub fn chain(slug: &str) -> ChainInfo {
        ChainInfo {
            slug: slug.to_string(),
            name: slug.to_string(),
            substrate: None,
            evm: None,
            bitcoin: None,
            ton: None,
            cardano: None,
        }
    }

    /// Fast-polling context plus the stream its sink feeds
    pub fn context(
        chain: ChainInfo,
        addresses: &[&str],
        assets: Vec<ChainAsset>,
    ) -> (AdapterContext, SubscriptionHandle, BalanceStream) {
        let session = SubscriptionHandle::new("test-session");
        let (sink, rx) = BalanceSink::channel(&session);
        let config = BalanceConfig {
            evm_poll_ms: 20,
            contract_poll_ms: 20,
            runtime_api_poll_ms: 20,
            non_evm_poll_ms: 20,
            lock_read_delay_ms: 1,
            request_timeout_ms: 500,
            ..Default::default()
        };
        let ctx = AdapterContext {
            chain: Arc::new(chain),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            assets,
            sink,
            config: Arc::new(config),
            tx_hint: None,
        };
        (ctx, session, rx)
    }

    /// Receive the next batch or fail after a second
    pub async fn next_batch(rx: &mut BalanceStream) -> Vec<BalanceItem> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for balances")
            .expect("stream closed")
    }
}
