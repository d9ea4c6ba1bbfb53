//! EVM native and ERC-20 balances
//!
//! EVM clients expose no push subscription, so balances are polled. Native and
//! ERC-20 balances run as separate pollers; asset types that are not fungible
//! EVM balances are reported as NOT_SUPPORT once.

use std::sync::Arc;

use balance_core::{AdapterError, AssetType, BalanceItem, BalanceState, ChainAsset};
use chain_client::{timed_request, EvmClient};
use futures::future::join_all;

use super::{spawn_poller, split_assets, zero_items, AdapterContext};
use crate::handle::SubscriptionHandle;

pub fn is_supported(asset: &ChainAsset) -> bool {
    matches!(asset.asset_type, AssetType::Native | AssetType::Erc20)
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn EvmClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let (supported, unsupported) = split_assets(&ctx.assets, is_supported);
    if !unsupported.is_empty() {
        ctx.sink.emit(zero_items(&ctx.addresses, &unsupported, BalanceState::NotSupport));
    }

    let (native, tokens): (Vec<ChainAsset>, Vec<ChainAsset>) =
        supported.into_iter().partition(ChainAsset::is_native);

    let tokens: Vec<(ChainAsset, String)> = tokens
        .into_iter()
        .filter_map(|asset| match asset.metadata.contract_address.clone() {
            Some(contract) => Some((asset, contract)),
            None => {
                tracing::warn!(chain = %ctx.chain_slug(), slug = %asset.slug, "ERC-20 without contract address");
                None
            }
        })
        .collect();

    let handle = SubscriptionHandle::new(ctx.label("evm"));

    if let Some(asset) = native.into_iter().next() {
        let native_handle = SubscriptionHandle::new(ctx.label("evm-native"));
        spawn_native_poller(ctx, &native_handle, client.clone(), asset);
        handle.attach(native_handle);
    }

    if !tokens.is_empty() {
        let token_handle = SubscriptionHandle::new(ctx.label("erc20"));
        spawn_erc20_poller(ctx, &token_handle, client, tokens);
        handle.attach(token_handle);
    }

    Ok(handle)
}

fn spawn_native_poller(
    ctx: &AdapterContext,
    handle: &SubscriptionHandle,
    client: Arc<dyn EvmClient>,
    asset: ChainAsset,
) {
    let addresses = Arc::new(ctx.addresses.clone());
    let timeout = ctx.request_timeout();
    let asset = Arc::new(asset);

    spawn_poller(handle, ctx.sink.scoped(handle), ctx.config.evm_poll_interval(), move || {
        let client = client.clone();
        let addresses = addresses.clone();
        let asset = asset.clone();
        async move {
            let reads = addresses.iter().map(|address| {
                let client = client.clone();
                async move { (address, timed_request(timeout, client.native_balance(address)).await) }
            });

            join_all(reads)
                .await
                .into_iter()
                .map(|(address, result)| match result {
                    Ok(free) => BalanceItem {
                        free,
                        ..BalanceItem::zero(address.clone(), asset.slug.clone(), BalanceState::Ready)
                    },
                    Err(e) => {
                        tracing::warn!(chain = client.chain_slug(), address = %address, "Native balance read failed: {}", e);
                        BalanceItem::zero(address.clone(), asset.slug.clone(), BalanceState::Ready)
                    }
                })
                .collect::<Vec<_>>()
        }
    });
}

fn spawn_erc20_poller(
    ctx: &AdapterContext,
    handle: &SubscriptionHandle,
    client: Arc<dyn EvmClient>,
    tokens: Vec<(ChainAsset, String)>,
) {
    let addresses = Arc::new(ctx.addresses.clone());
    let tokens = Arc::new(tokens);
    let timeout = ctx.request_timeout();

    spawn_poller(handle, ctx.sink.scoped(handle), ctx.config.evm_poll_interval(), move || {
        let client = client.clone();
        let addresses = addresses.clone();
        let tokens = tokens.clone();
        async move {
            let reads = tokens
                .iter()
                .flat_map(|token| addresses.iter().map(move |address| (token, address)))
                .map(|((asset, contract), address)| {
                    let client = client.clone();
                    async move {
                        let result =
                            timed_request(timeout, client.erc20_balance(contract, address)).await;
                        (asset, contract, address, result)
                    }
                });

            join_all(reads)
                .await
                .into_iter()
                .map(|(asset, contract, address, result)| {
                    let free = result.unwrap_or_else(|e| {
                        tracing::warn!(
                            chain = client.chain_slug(),
                            contract = %contract,
                            address = %address,
                            "ERC-20 balance read failed: {}",
                            e
                        );
                        Default::default()
                    });
                    BalanceItem {
                        free,
                        ..BalanceItem::zero(address.clone(), asset.slug.clone(), BalanceState::Ready)
                    }
                })
                .collect::<Vec<_>>()
        }
    });
}


#[cfg(test)]
mod tests {
    use super::mock::MockEvm;
    use super::*;
    use crate::adapters::testing::{asset, chain, context, next_batch};
    use balance_core::Amount;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b2";

    #[tokio::test]
    async fn test_native_balances_and_failures() {
        let eth = asset("ethereum-NATIVE-ETH", "ethereum", AssetType::Native, 0);
        let (ctx, session, mut rx) = context(chain("ethereum"), &[ALICE, BOB], vec![eth]);
        let client = MockEvm::new("ethereum");
        client.native.lock().unwrap().insert(ALICE.into(), Amount::from(10u64));

        let handle = subscribe(&ctx, Arc::new(client)).unwrap();
        session.attach(handle);

        let batch = next_batch(&mut rx).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].free, Amount::from(10u64));
        // Bob's read fails and degrades to zero
        assert!(batch[1].free.is_zero());
        assert_eq!(batch[1].state, BalanceState::Ready);
        session.cancel();
    }

    #[tokio::test]
    async fn test_erc20_and_unsupported() {
        let mut usdc = asset("ethereum-ERC20-USDC", "ethereum", AssetType::Erc20, 0);
        usdc.metadata.contract_address = Some("0xusdc".into());
        let nft = asset("ethereum-ERC721-PUNK", "ethereum", AssetType::Erc721, 0);

        let (ctx, session, mut rx) = context(chain("ethereum"), &[ALICE], vec![usdc, nft]);
        let client = MockEvm::new("ethereum");
        client
            .erc20
            .lock()
            .unwrap()
            .insert(("0xusdc".into(), ALICE.into()), Amount::from(5u64));

        let handle = subscribe(&ctx, Arc::new(client)).unwrap();
        session.attach(handle);

        let first = next_batch(&mut rx).await;
        assert_eq!(first[0].token_slug.as_str(), "ethereum-ERC721-PUNK");
        assert_eq!(first[0].state, BalanceState::NotSupport);

        let second = next_batch(&mut rx).await;
        assert_eq!(second[0].token_slug.as_str(), "ethereum-ERC20-USDC");
        assert_eq!(second[0].free, Amount::from(5u64));
        session.cancel();
    }

    #[tokio::test]
    async fn test_polling_stops_after_cancel() {
        let eth = asset("ethereum-NATIVE-ETH", "ethereum", AssetType::Native, 0);
        let (ctx, session, mut rx) = context(chain("ethereum"), &[ALICE], vec![eth]);
        let client = Arc::new(MockEvm::new("ethereum"));
        client.native.lock().unwrap().insert(ALICE.into(), Amount::from(1u64));

        let handle = subscribe(&ctx, client.clone()).unwrap();
        session.attach(handle);
        next_batch(&mut rx).await;

        session.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let calls = client.call_count();
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        assert_eq!(client.call_count(), calls);
    }
}
