//! Giga-token balances read through the currencies runtime API
//!
//! These aTokens have no storage to subscribe to, so the adapter polls.

use std::sync::Arc;

use balance_core::{
    applied_existential_deposit, AdapterError, Amount, BalanceItem, BalanceState, ChainAsset,
};
use chain_client::{timed_request, RuntimeApi, RuntimeApiCall, SubstrateClient};
use futures::future::join_all;
use serde_json::Value;

use super::account::TokenAccountData;
use super::asset_id_arg;
use crate::adapters::{spawn_poller, AdapterContext};
use crate::handle::SubscriptionHandle;

struct GigaToken {
    asset: ChainAsset,
    asset_id: Value,
    applied_ed: Amount,
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let tokens: Vec<GigaToken> = ctx
        .assets
        .iter()
        .filter_map(|asset| {
            let asset_id = asset.resolved_asset_id()?;
            Some(GigaToken {
                asset: asset.clone(),
                asset_id: asset_id_arg(asset_id),
                applied_ed: applied_existential_deposit(&asset.min_amount, ctx.tx_hint),
            })
        })
        .collect();

    if tokens.is_empty() {
        return Err(AdapterError::UnresolvedAsset {
            slug: ctx
                .assets
                .iter()
                .map(|a| a.slug.to_string())
                .collect::<Vec<_>>()
                .join(","),
        });
    }

    let handle = SubscriptionHandle::new(ctx.label("giga"));
    let tokens = Arc::new(tokens);
    let addresses = Arc::new(ctx.addresses.clone());
    let timeout = ctx.request_timeout();
    let chain = ctx.chain_slug().to_string();

    spawn_poller(
        &handle,
        ctx.sink.scoped(&handle),
        ctx.config.runtime_api_poll_interval(),
        move || {
            let client = client.clone();
            let tokens = tokens.clone();
            let addresses = addresses.clone();
            let chain = chain.clone();
            async move {
                let reads = tokens.iter().flat_map(|token| {
                    addresses.iter().map(move |address| (token, address))
                });
                let reads = reads.map(|(token, address)| {
                    let client = client.clone();
                    let call = RuntimeApiCall::new(
                        RuntimeApi::CurrenciesAccount,
                        vec![token.asset_id.clone(), Value::from(address.as_str())],
                    );
                    async move {
                        let result = timed_request(timeout, client.call_runtime_api(call)).await;
                        (token, address, result)
                    }
                });

                join_all(reads)
                    .await
                    .into_iter()
                    .map(|(token, address, result)| match result {
                        Ok(value) => {
                            let data = TokenAccountData::from_value(&value);
                            BalanceItem::ready(
                                address.clone(),
                                token.asset.slug.clone(),
                                data.transferable(&token.applied_ed),
                                data.locked(),
                            )
                        }
                        Err(e) => {
                            tracing::warn!(
                                chain = %chain,
                                slug = %token.asset.slug,
                                address = %address,
                                "Currencies API read failed: {}",
                                e
                            );
                            BalanceItem::zero(address.clone(), token.asset.slug.clone(), BalanceState::Ready)
                        }
                    })
                    .collect::<Vec<_>>()
            }
        },
    );

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::substrate::mock::MockSubstrate;
    use crate::adapters::testing::{asset, chain, context, next_batch};
    use balance_core::AssetType;
    use serde_json::json;

    fn gigadot() -> ChainAsset {
        let mut token = asset("hydradx_main-LOCAL-GIGADOT", "hydradx_main", AssetType::Local, 0);
        token.metadata.asset_id = Some("69".into());
        token.metadata.runtime_api_balance = true;
        token
    }

    #[tokio::test]
    async fn test_polls_currencies_api() {
        let (ctx, session, mut rx) = context(chain("hydradx_main"), &["A"], vec![gigadot()]);
        let client = MockSubstrate::new("hydradx_main");
        client.set_runtime_api(
            RuntimeApi::CurrenciesAccount,
            json!({"A": {"free": "3000", "reserved": "0", "frozen": "0"}}),
        );

        let handle = subscribe(&ctx, Arc::new(client)).unwrap();
        session.attach(handle);

        let first = next_batch(&mut rx).await;
        assert_eq!(first[0].free, Amount::from(3000u64));
        // Polling continues
        let second = next_batch(&mut rx).await;
        assert_eq!(second[0].token_slug, first[0].token_slug);
        session.cancel();
    }

    #[tokio::test]
    async fn test_failed_read_yields_zero() {
        let (ctx, session, mut rx) = context(chain("hydradx_main"), &["A"], vec![gigadot()]);
        // No currencies API registered: every call fails
        let client = Arc::new(MockSubstrate::new("hydradx_main"));

        let handle = subscribe(&ctx, client).unwrap();
        session.attach(handle);

        let item = next_batch(&mut rx).await.remove(0);
        assert!(item.free.is_zero());
        assert_eq!(item.state, BalanceState::Ready);
        session.cancel();
    }
}
