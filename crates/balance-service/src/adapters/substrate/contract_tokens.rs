//! Smart-contract token balances (PSP22, GRC-20, VFT)
//!
//! Contract storage cannot be subscribed to, so every (token, address) pair is
//! read with a contract query on each poll cycle. A failed query only zeroes
//! that pair.

use std::sync::Arc;

use balance_core::{AdapterError, AssetType, BalanceItem, BalanceState, ChainAsset};
use chain_client::{timed_request, ContractCall, ContractStandard, SubstrateClient};
use futures::future::join_all;

use crate::adapters::{spawn_poller, AdapterContext};
use crate::handle::SubscriptionHandle;

pub fn standard_for(asset_type: AssetType) -> Option<ContractStandard> {
    match asset_type {
        AssetType::Psp22 => Some(ContractStandard::Psp22),
        AssetType::Grc20 => Some(ContractStandard::Grc20),
        AssetType::Vft => Some(ContractStandard::Vft),
        _ => None,
    }
}

struct ContractToken {
    asset: ChainAsset,
    standard: ContractStandard,
    contract: String,
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let mut tokens = Vec::new();
    for asset in &ctx.assets {
        let standard = standard_for(asset.asset_type).ok_or_else(|| {
            AdapterError::UnsupportedAsset {
                slug: asset.slug.to_string(),
                adapter: "contract-tokens".to_string(),
            }
        });
        let contract = asset.metadata.contract_address.clone();

        match (standard, contract) {
            (Ok(standard), Some(contract)) => tokens.push(ContractToken {
                asset: asset.clone(),
                standard,
                contract,
            }),
            (Err(e), _) => tracing::warn!(chain = %ctx.chain_slug(), "{}", e),
            (_, None) => tracing::warn!(
                chain = %ctx.chain_slug(),
                slug = %asset.slug,
                "Contract token without contract address"
            ),
        }
    }

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

    let handle = SubscriptionHandle::new(ctx.label("contract-tokens"));
    let tokens = Arc::new(tokens);
    let addresses = Arc::new(ctx.addresses.clone());
    let timeout = ctx.request_timeout();
    let chain = ctx.chain_slug().to_string();

    spawn_poller(
        &handle,
        ctx.sink.scoped(&handle),
        ctx.config.contract_poll_interval(),
        move || {
            let client = client.clone();
            let tokens = tokens.clone();
            let addresses = addresses.clone();
            let chain = chain.clone();
            async move {
                let calls = tokens.iter().flat_map(|token| {
                    addresses.iter().map(move |address| (token, address))
                });
                let calls = calls.map(|(token, address)| {
                    let client = client.clone();
                    let call = ContractCall::balance_of(token.standard, &token.contract, address);
                    async move {
                        let result = timed_request(timeout, client.call_contract(call)).await;
                        (token, address, result)
                    }
                });

                join_all(calls)
                    .await
                    .into_iter()
                    .map(|(token, address, result)| {
                        let free = result.unwrap_or_else(|e| {
                            tracing::warn!(
                                chain = %chain,
                                contract = %token.contract,
                                address = %address,
                                "Contract balance query failed: {}",
                                e
                            );
                            Default::default()
                        });
                        BalanceItem {
                            free,
                            ..BalanceItem::zero(address.clone(), token.asset.slug.clone(), BalanceState::Ready)
                        }
                    })
                    .collect::<Vec<_>>()
            }
        },
    );

    Ok(handle)
}
