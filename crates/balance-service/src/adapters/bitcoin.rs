//! Bitcoin native balances
//!
//! Outputs carrying inscriptions or runes are reported as locked so they are not
//! spent as fee inputs by accident. Meta-protocol tokens are NOT_SUPPORT.

use std::sync::Arc;

use balance_core::{AdapterError, BalanceItem, BalanceState, ChainAsset};
use chain_client::{timed_request, BitcoinClient};
use futures::future::join_all;

use super::{spawn_poller, split_assets, zero_items, AdapterContext};
use crate::handle::SubscriptionHandle;

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn BitcoinClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let (native, unsupported) = split_assets(&ctx.assets, ChainAsset::is_native);
    if !unsupported.is_empty() {
        ctx.sink.emit(zero_items(&ctx.addresses, &unsupported, BalanceState::NotSupport));
    }

    let asset = native
        .into_iter()
        .next()
        .ok_or_else(|| AdapterError::UnsupportedAsset {
            slug: unsupported
                .first()
                .map(|a| a.slug.to_string())
                .unwrap_or_default(),
            adapter: "bitcoin".to_string(),
        })?;

    let handle = SubscriptionHandle::new(ctx.label("bitcoin"));
    let addresses = Arc::new(ctx.addresses.clone());
    let timeout = ctx.request_timeout();

    spawn_poller(
        &handle,
        ctx.sink.scoped(&handle),
        ctx.config.non_evm_poll_interval(),
        move || {
            let client = client.clone();
            let addresses = addresses.clone();
            let asset = asset.clone();
            async move {
                let reads = addresses.iter().map(|address| {
                    let client = client.clone();
                    async move { (address, timed_request(timeout, client.address_balance(address)).await) }
                });

                join_all(reads)
                    .await
                    .into_iter()
                    .map(|(address, result)| match result {
                        Ok(balance) => BalanceItem::ready(
                            address.clone(),
                            asset.slug.clone(),
                            balance.spendable(),
                            balance.inscription_value.clone(),
                        ),
                        Err(e) => {
                            tracing::warn!(chain = client.chain_slug(), address = %address, "Bitcoin balance read failed: {}", e);
                            BalanceItem::zero(address.clone(), asset.slug.clone(), BalanceState::Ready)
                        }
                    })
                    .collect::<Vec<_>>()
            }
        },
    );

    Ok(handle)
}
