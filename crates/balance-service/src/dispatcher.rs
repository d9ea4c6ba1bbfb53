//! Per-chain adapter selection
//!
//! For every selected chain the dispatcher reports format-incompatible addresses
//! as NOT_SUPPORT, classifies the chain into one family and starts that family's
//! adapter under a per-chain handle. Failures are logged and never reach the
//! caller.

use std::sync::Arc;

use balance_core::{
    AdapterError, AssetType, BalanceConfig, BalanceItem, BalanceState, ChainAsset, ChainFamily,
    TokenSlug, TxTypeHint,
};
use chain_client::{ClientMaps, SubstrateClient};

use crate::address::{partition_addresses, AddressFormat};
use crate::adapters::{self, zero_items, AdapterContext};
use crate::handle::SubscriptionHandle;
use crate::registry::Registry;
use crate::sink::BalanceSink;

/// What to watch
#[derive(Debug, Clone, Default)]
pub struct SubscribeRequest {
    pub addresses: Vec<String>,
    pub chains: Vec<String>,
    /// Empty means every asset of the selected chains
    pub tokens: Vec<TokenSlug>,
    pub tx_hint: Option<TxTypeHint>,
}

/// Synchronous emitter for records produced before any adapter starts
pub type ImmediateEmit<'a> = &'a (dyn Fn(Vec<BalanceItem>) + Send + Sync);

pub struct Dispatcher {
    pub(crate) registry: Arc<Registry>,
    pub(crate) clients: ClientMaps,
    pub(crate) config: Arc<BalanceConfig>,
    pub(crate) address_format: Arc<dyn AddressFormat>,
}

impl Dispatcher {
    /// Start adapters for every selected chain, attaching their handles to `session`
    pub fn start(
        &self,
        request: &SubscribeRequest,
        session: &SubscriptionHandle,
        sink: &BalanceSink,
        immediate: ImmediateEmit<'_>,
    ) {
        for (chain, assets) in self.registry.select(&request.chains, &request.tokens) {
            let (compatible, incompatible) =
                partition_addresses(self.address_format.as_ref(), &request.addresses, &chain);

            if !incompatible.is_empty() {
                immediate(zero_items(&incompatible, &assets, BalanceState::NotSupport));
            }
            if compatible.is_empty() {
                continue;
            }

            let chain_handle = SubscriptionHandle::new(chain.slug.clone());
            session.attach(chain_handle.clone());

            let ctx = AdapterContext {
                chain: chain.clone(),
                addresses: compatible,
                assets,
                sink: sink.scoped(&chain_handle),
                config: self.config.clone(),
                tx_hint: request.tx_hint,
            };

            self.start_chain(&ctx, &chain_handle, immediate);
        }
    }

    fn start_chain(
        &self,
        ctx: &AdapterContext,
        chain_handle: &SubscriptionHandle,
        immediate: ImmediateEmit<'_>,
    ) {
        let slug = ctx.chain_slug();
        let family = ctx.chain.family();

        let started = match family {
            ChainFamily::Evm => self
                .clients
                .evm
                .get(slug)
                .ok_or_else(|| missing_client(slug, family))
                .and_then(|client| adapters::evm::subscribe(ctx, client.clone())),
            ChainFamily::Bitcoin => self
                .clients
                .bitcoin
                .get(slug)
                .ok_or_else(|| missing_client(slug, family))
                .and_then(|client| adapters::bitcoin::subscribe(ctx, client.clone())),
            ChainFamily::Ton => self
                .clients
                .ton
                .get(slug)
                .ok_or_else(|| missing_client(slug, family))
                .and_then(|client| adapters::ton::subscribe(ctx, client.clone())),
            ChainFamily::Cardano => self
                .clients
                .cardano
                .get(slug)
                .ok_or_else(|| missing_client(slug, family))
                .and_then(|client| adapters::cardano::subscribe(ctx, client.clone())),
            ChainFamily::Substrate => {
                self.start_substrate(ctx, chain_handle, immediate);
                return;
            }
        };

        match started {
            Ok(handle) => chain_handle.attach(handle),
            Err(e) => tracing::warn!(chain = %slug, "Adapter not started: {}", e),
        }
    }

    /// Substrate chains, including hybrid Substrate+EVM chains whose ERC-20
    /// tokens are read through the EVM client
    fn start_substrate(
        &self,
        ctx: &AdapterContext,
        chain_handle: &SubscriptionHandle,
        immediate: ImmediateEmit<'_>,
    ) {
        let slug = ctx.chain_slug();
        let mut substrate_assets = ctx.assets.clone();

        if let (Some(_), Some(evm_client)) = (&ctx.chain.evm, self.clients.evm.get(slug)) {
            let (erc20, rest): (Vec<ChainAsset>, Vec<ChainAsset>) = substrate_assets
                .into_iter()
                .partition(|asset| asset.asset_type == AssetType::Erc20);
            substrate_assets = rest;

            if !erc20.is_empty() {
                match adapters::evm::subscribe(&ctx.with_assets(erc20), evm_client.clone()) {
                    Ok(handle) => chain_handle.attach(handle),
                    Err(e) => tracing::warn!(chain = %slug, "EVM token adapter not started: {}", e),
                }
            }
        }

        if substrate_assets.is_empty() {
            return;
        }
        let ctx = ctx.with_assets(substrate_assets);

        let Some(client) = self.clients.substrate.get(slug).cloned() else {
            tracing::warn!(chain = %slug, "{}", missing_client(slug, ChainFamily::Substrate));
            return;
        };

        if client.is_ready() {
            start_substrate_adapter(&ctx, client, chain_handle);
            return;
        }

        // Placeholder so callers never block on a connecting client
        immediate(zero_items(&ctx.addresses, &ctx.assets, BalanceState::Pending));

        let handle = chain_handle.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = client.wait_ready().await {
                tracing::warn!(chain = %ctx.chain_slug(), "Substrate client never became ready: {}", e);
                return;
            }
            if handle.is_cancelled() {
                return;
            }
            tracing::debug!(chain = %ctx.chain_slug(), "Substrate client ready");
            start_substrate_adapter(&ctx, client, &handle);
        });
        chain_handle.add_task(task);
    }
}

fn start_substrate_adapter(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
    chain_handle: &SubscriptionHandle,
) {
    match adapters::substrate::subscribe(ctx, client) {
        Ok(handle) => chain_handle.attach(handle),
        Err(e) => tracing::warn!(chain = %ctx.chain_slug(), "Substrate adapter not started: {}", e),
    }
}

fn missing_client(chain: &str, family: ChainFamily) -> AdapterError {
    AdapterError::MissingClient {
        chain: chain.to_string(),
        family: family.to_string(),
    }
}
