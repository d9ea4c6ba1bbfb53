//! pallet-assets balances (`assets.account`)

use std::sync::Arc;

use balance_core::{
    applied_existential_deposit, AdapterError, Amount, BalanceItem, BalanceState, ChainAsset,
};
use chain_client::{StorageEntry, StorageQuery, StorageResults, SubstrateClient};
use serde_json::Value;

use super::account::AssetAccountData;
use super::{asset_id_arg, spawn_storage_watch};
use crate::adapters::AdapterContext;
use crate::handle::SubscriptionHandle;

/// A watched (address, asset) account together with the query that reads it
pub(crate) struct AssetKey {
    pub address: String,
    pub asset: ChainAsset,
    pub applied_ed: Amount,
    pub query: StorageQuery,
}

pub(crate) fn to_items(keys: &[AssetKey], results: &StorageResults) -> Vec<BalanceItem> {
    keys.iter()
        .map(|key| {
            let (free, locked) = AssetAccountData::from_value(results.get(&key.query))
                .map(|data| data.free_and_locked(&key.applied_ed))
                .unwrap_or_default();
            BalanceItem::ready(key.address.clone(), key.asset.slug.clone(), free, locked)
        })
        .collect()
}

/// Watch `keys` until cancelled
pub(crate) fn watch(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
    name: &str,
    keys: Vec<AssetKey>,
) -> SubscriptionHandle {
    let handle = SubscriptionHandle::new(ctx.label(name));
    let queries = keys.iter().map(|k| k.query.clone()).collect();
    let unreadable = keys
        .iter()
        .map(|k| BalanceItem::zero(k.address.clone(), k.asset.slug.clone(), BalanceState::Ready))
        .collect();
    let keys = Arc::new(keys);

    spawn_storage_watch(
        &handle,
        ctx.sink.scoped(&handle),
        client,
        queries,
        unreadable,
        ctx.request_timeout(),
        move |results| {
            let items = to_items(&keys, &results);
            async move { items }
        },
    );

    handle
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let mut keys = Vec::new();

    for asset in &ctx.assets {
        let Some(asset_id) = asset.resolved_asset_id() else {
            tracing::warn!(
                chain = %ctx.chain_slug(),
                slug = %asset.slug,
                "Unresolvable asset id, not subscribing"
            );
            continue;
        };
        let applied_ed = applied_existential_deposit(&asset.min_amount, ctx.tx_hint);

        for address in &ctx.addresses {
            keys.push(AssetKey {
                address: address.clone(),
                asset: asset.clone(),
                applied_ed: applied_ed.clone(),
                query: StorageQuery::new(
                    StorageEntry::AssetsAccount,
                    vec![asset_id_arg(asset_id), Value::from(address.as_str())],
                ),
            });
        }
    }

    if keys.is_empty() {
        return Err(AdapterError::UnresolvedAsset {
            slug: ctx
                .assets
                .iter()
                .map(|a| a.slug.to_string())
                .collect::<Vec<_>>()
                .join(","),
        });
    }

    Ok(watch(ctx, client, "assets", keys))
}
