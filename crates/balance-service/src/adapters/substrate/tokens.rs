//! ORML-style token balances (`tokens.accounts`, `ormlTokens.accounts`)

use std::sync::Arc;

use balance_core::{
    applied_existential_deposit, AdapterError, Amount, BalanceItem, BalanceState, ChainAsset,
};
use chain_client::{StorageEntry, StorageQuery, StorageResults, SubstrateClient};
use serde_json::Value;

use super::account::TokenAccountData;
use super::spawn_storage_watch;
use crate::adapters::AdapterContext;
use crate::handle::SubscriptionHandle;

/// One watched (address, token) storage key
struct TokenKey {
    address: String,
    asset: ChainAsset,
    applied_ed: Amount,
    query: StorageQuery,
}

fn to_items(keys: &[TokenKey], results: &StorageResults) -> Vec<BalanceItem> {
    keys.iter()
        .map(|key| {
            let data = TokenAccountData::from_value(results.get(&key.query));
            BalanceItem::ready(
                key.address.clone(),
                key.asset.slug.clone(),
                data.transferable(&key.applied_ed),
                data.locked(),
            )
        })
        .collect()
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
    entry: StorageEntry,
) -> Result<SubscriptionHandle, AdapterError> {
    let mut keys = Vec::new();

    for asset in &ctx.assets {
        let Some(currency_id) = asset.metadata.on_chain_info.clone() else {
            tracing::warn!(
                chain = %ctx.chain_slug(),
                slug = %asset.slug,
                "Token has no currency id, skipping"
            );
            continue;
        };
        let applied_ed = applied_existential_deposit(&asset.min_amount, ctx.tx_hint);

        for address in &ctx.addresses {
            keys.push(TokenKey {
                address: address.clone(),
                asset: asset.clone(),
                applied_ed: applied_ed.clone(),
                query: StorageQuery::new(entry, vec![Value::from(address.as_str()), currency_id.clone()]),
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

    let (module, _) = entry.pallet_method();
    let handle = SubscriptionHandle::new(ctx.label(module));
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

    Ok(handle)
}
