//! Cardano ADA and CIP-26 native asset balances
//!
//! One address query returns every unit the address holds, so each poll cycle
//! makes a single request per address and fans the result out per asset.

use std::collections::HashMap;
use std::sync::Arc;

use balance_core::{AdapterError, Amount, AssetType, BalanceItem, BalanceState, ChainAsset};
use chain_client::{timed_request, CardanoClient, LOVELACE_UNIT};
use futures::future::join_all;

use super::{spawn_poller, split_assets, zero_items, AdapterContext};
use crate::handle::SubscriptionHandle;

/// Unit under which the address balance map reports this asset
pub fn asset_unit(asset: &ChainAsset) -> Option<&str> {
    match asset.asset_type {
        AssetType::Native => Some(LOVELACE_UNIT),
        AssetType::Cardano => asset.metadata.policy_id_and_name.as_deref(),
        _ => None,
    }
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn CardanoClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let (supported, unsupported) = split_assets(&ctx.assets, |a| asset_unit(a).is_some());
    if !unsupported.is_empty() {
        ctx.sink.emit(zero_items(&ctx.addresses, &unsupported, BalanceState::NotSupport));
    }
    if supported.is_empty() {
        return Err(AdapterError::UnsupportedAsset {
            slug: unsupported
                .first()
                .map(|a| a.slug.to_string())
                .unwrap_or_default(),
            adapter: "cardano".to_string(),
        });
    }

    let handle = SubscriptionHandle::new(ctx.label("cardano"));
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
                let reads = addresses.iter().map(|address| {
                    let client = client.clone();
                    async move { (address, timed_request(timeout, client.address_balances(address)).await) }
                });

                let mut items = Vec::new();
                for (address, result) in join_all(reads).await {
                    let balances: HashMap<String, Amount> = result.unwrap_or_else(|e| {
                        tracing::warn!(chain = client.chain_slug(), address = %address, "Cardano balance read failed: {}", e);
                        HashMap::new()
                    });

                    for asset in assets.iter() {
                        let free = asset_unit(asset)
                            .and_then(|unit| balances.get(unit))
                            .cloned()
                            .unwrap_or_default();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::{asset, chain, context, next_batch};
    use async_trait::async_trait;
    use chain_client::CardanoTransfer;

    struct MockCardano;

    #[async_trait]
    impl CardanoClient for MockCardano {
        fn chain_slug(&self) -> &str {
            "cardano"
        }

        async fn address_balances(&self, _address: &str) -> chain_client::Result<HashMap<String, Amount>> {
            Ok(HashMap::from([
                (LOVELACE_UNIT.to_string(), Amount::from(5_000_000u64)),
                ("abc123.4d494e".to_string(), Amount::from(12u64)),
            ]))
        }

        async fn estimate_fee(&self, _transfer: &CardanoTransfer) -> chain_client::Result<Amount> {
            Ok(Amount::zero())
        }
    }

    #[tokio::test]
    async fn test_units_fan_out() {
        let ada = asset("cardano-NATIVE-ADA", "cardano", AssetType::Native, 0);
        let mut min = asset("cardano-CIP26-MIN", "cardano", AssetType::Cardano, 0);
        min.metadata.policy_id_and_name = Some("abc123.4d494e".into());
        let mut absent = asset("cardano-CIP26-NONE", "cardano", AssetType::Cardano, 0);
        absent.metadata.policy_id_and_name = Some("ffff".into());

        let (ctx, session, mut rx) = context(chain("cardano"), &["addr1xyz"], vec![ada, min, absent]);
        let handle = subscribe(&ctx, Arc::new(MockCardano)).unwrap();
        session.attach(handle);

        let batch = next_batch(&mut rx).await;
        assert_eq!(batch[0].free, Amount::from(5_000_000u64));
        assert_eq!(batch[1].free, Amount::from(12u64));
        assert!(batch[2].free.is_zero());
        session.cancel();
    }
}
