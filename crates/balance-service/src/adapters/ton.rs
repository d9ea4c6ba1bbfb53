//! TON native and jetton balances

use std::sync::Arc;

use balance_core::{AdapterError, AssetType, BalanceItem, BalanceState, ChainAsset};
use chain_client::{timed_request, TonClient};
use futures::future::join_all;

use super::{spawn_poller, split_assets, zero_items, AdapterContext};
use crate::handle::SubscriptionHandle;

pub fn is_supported(asset: &ChainAsset) -> bool {
    match asset.asset_type {
        AssetType::Native => true,
        AssetType::TonJetton => asset.metadata.contract_address.is_some(),
        _ => false,
    }
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn TonClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let (supported, unsupported) = split_assets(&ctx.assets, is_supported);
    if !unsupported.is_empty() {
        ctx.sink.emit(zero_items(&ctx.addresses, &unsupported, BalanceState::NotSupport));
    }
    if supported.is_empty() {
        return Err(AdapterError::UnsupportedAsset {
            slug: unsupported
                .first()
                .map(|a| a.slug.to_string())
                .unwrap_or_default(),
            adapter: "ton".to_string(),
        });
    }

    let handle = SubscriptionHandle::new(ctx.label("ton"));
    let addresses = Arc::new(ctx.addresses.clone());
    let assets = Arc::new(supported);
    let timeout = ctx.request_timeout();

    spawn_poller(
        &handle,
        ctx.sink.scoped(&handle),
        ctx.config.non_evm_poll_interval(),
        move || {
            let client = client.clone();
            let addresses = addresses.clone();
            let assets = assets.clone();
            async move {
                let reads = assets
                    .iter()
                    .flat_map(|asset| addresses.iter().map(move |address| (asset, address)))
                    .map(|(asset, address)| {
                        let client = client.clone();
                        async move {
                            let read = async {
                                match &asset.metadata.contract_address {
                                    Some(master) if asset.asset_type == AssetType::TonJetton => {
                                        client.jetton_balance(address, master).await
                                    }
                                    _ => client.native_balance(address).await,
                                }
                            };
                            (asset, address, timed_request(timeout, read).await)
                        }
                    });

                join_all(reads)
                    .await
                    .into_iter()
                    .map(|(asset, address, result)| {
                        let free = result.unwrap_or_else(|e| {
                            tracing::warn!(chain = client.chain_slug(), slug = %asset.slug, address = %address, "TON balance read failed: {}", e);
                            Default::default()
                        });
                        BalanceItem {
                            free,
                            ..BalanceItem::zero(address.clone(), asset.slug.clone(), BalanceState::Ready)
                        }
                    })
                    .collect::<Vec<_>>()
            }
        },
    );

    Ok(handle)
}
