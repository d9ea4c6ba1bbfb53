//! Subnet-staked balances on bittensor-family chains
//!
//! Stake is only readable through the `stakeInfoRuntimeApi`, so this adapter
//! polls. Each subnet token's free balance is the coldkey's total stake on that
//! subnet across all hotkeys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use balance_core::{AdapterError, Amount, BalanceItem, BalanceState, ChainAsset};
use chain_client::{timed_request, RuntimeApi, RuntimeApiCall, SubstrateClient};
use futures::future::join_all;
use serde_json::Value;

use crate::adapters::{spawn_poller, AdapterContext};
use crate::handle::SubscriptionHandle;

/// Netuid of the root subnet; its stake counts as native staking
pub const ROOT_NETUID: u16 = 0;

/// Sum stake per netuid from a `getStakeInfoForColdkey` response
pub fn stake_by_netuid(value: &Value) -> HashMap<u16, Amount> {
    let mut totals: HashMap<u16, Amount> = HashMap::new();
    let Some(entries) = value.as_array() else {
        return totals;
    };

    for entry in entries {
        let netuid = entry
            .get("netuid")
            .and_then(Value::as_u64)
            .and_then(|n| u16::try_from(n).ok());
        let stake = entry.get("stake").and_then(Amount::from_json);

        if let (Some(netuid), Some(stake)) = (netuid, stake) {
            let total = totals.entry(netuid).or_default();
            *total = &*total + &stake;
        }
    }

    totals
}

/// Read a coldkey's stake per netuid
pub async fn fetch_stake(
    client: &dyn SubstrateClient,
    address: &str,
    timeout: Duration,
) -> chain_client::Result<HashMap<u16, Amount>> {
    let call = RuntimeApiCall::new(
        RuntimeApi::StakeInfoForColdkey,
        vec![Value::from(address)],
    );
    let value = timed_request(timeout, client.call_runtime_api(call)).await?;
    Ok(stake_by_netuid(&value))
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let assets: Vec<(u16, ChainAsset)> = ctx
        .assets
        .iter()
        .filter_map(|asset| asset.metadata.netuid.map(|netuid| (netuid, asset.clone())))
        .collect();

    if assets.is_empty() {
        return Err(AdapterError::UnresolvedAsset {
            slug: ctx
                .assets
                .first()
                .map(|a| a.slug.to_string())
                .unwrap_or_default(),
        });
    }

    let handle = SubscriptionHandle::new(ctx.label("subnet"));
    let addresses = Arc::new(ctx.addresses.clone());
    let assets = Arc::new(assets);
    let timeout = ctx.request_timeout();
    let chain = ctx.chain_slug().to_string();

    spawn_poller(
        &handle,
        ctx.sink.scoped(&handle),
        ctx.config.runtime_api_poll_interval(),
        move || {
            let client = client.clone();
            let addresses = addresses.clone();
            let assets = assets.clone();
            let chain = chain.clone();
            async move {
                let reads = addresses.iter().map(|address| {
                    let client = client.clone();
                    async move { (address, fetch_stake(client.as_ref(), address, timeout).await) }
                });

                let mut items = Vec::new();
                for (address, result) in join_all(reads).await {
                    let stake = match result {
                        Ok(stake) => stake,
                        Err(e) => {
                            tracing::warn!(chain = %chain, address = %address, "Failed to read subnet stake: {}", e);
                            HashMap::new()
                        }
                    };

                    for (netuid, asset) in assets.iter() {
                        let free = stake.get(netuid).cloned().unwrap_or_default();
                        items.push(BalanceItem {
                            free,
                            ..BalanceItem::zero(address.clone(), asset.slug.clone(), BalanceState::Ready)
                        });
                    }
                }
                items
            }
        },
    );

    Ok(handle)
}
