//! Substrate balance adapter
//!
//! One Substrate chain can expose several balance pallets at once. Assets are
//! routed to a sub-adapter per pallet using the static tables in `chain_groups`;
//! each sub-adapter gets its own child handle. A sub-adapter that fails to start
//! is logged and skipped without affecting its siblings.

pub mod account;
pub mod assets;
pub mod contract_tokens;
pub mod foreign_assets;
pub mod giga;
pub mod subnet;
pub mod system;
pub mod tokens;

use std::future::Future;
use std::sync::Arc;

use balance_core::{AdapterError, AssetType, BalanceItem, BalanceState, ChainAsset};
use chain_client::{
    detect_capabilities, timed_request, ChainCapabilities, StorageEntry, StorageQuery,
    StorageResults, SubstrateClient,
};

use super::{zero_items, AdapterContext};
use crate::chain_groups;
use crate::handle::SubscriptionHandle;
use crate::sink::BalanceSink;

/// Pallet sub-adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAdapter {
    System,
    Tokens,
    OrmlTokens,
    Assets,
    ForeignAssets,
    Giga,
    ContractTokens,
    Subnet,
}

impl SubAdapter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Tokens => "tokens",
            Self::OrmlTokens => "orml-tokens",
            Self::Assets => "assets",
            Self::ForeignAssets => "foreign-assets",
            Self::Giga => "giga",
            Self::ContractTokens => "contract-tokens",
            Self::Subnet => "subnet",
        }
    }
}

/// Pick the sub-adapter for an asset on a chain; `None` means unsupported
pub fn route_asset(chain: &str, asset: &ChainAsset) -> Option<SubAdapter> {
    match asset.asset_type {
        AssetType::Native => chain_groups::uses_system_account(chain).then_some(SubAdapter::System),
        AssetType::Psp22 | AssetType::Grc20 | AssetType::Vft => Some(SubAdapter::ContractTokens),
        AssetType::Local => {
            if chain_groups::has_giga_tokens(chain) && asset.metadata.runtime_api_balance {
                Some(SubAdapter::Giga)
            } else if chain_groups::is_bittensor(chain) && asset.metadata.netuid.is_some() {
                Some(SubAdapter::Subnet)
            } else if chain_groups::uses_tokens_pallet(chain) {
                Some(SubAdapter::Tokens)
            } else if chain_groups::uses_orml_tokens(chain) {
                Some(SubAdapter::OrmlTokens)
            } else if chain_groups::supports_foreign_assets(chain)
                && asset.metadata.multilocation.is_some()
            {
                Some(SubAdapter::ForeignAssets)
            } else if chain_groups::uses_assets_pallet(chain) {
                Some(SubAdapter::Assets)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Start every applicable sub-adapter for a ready Substrate client
pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
) -> Result<SubscriptionHandle, AdapterError> {
    let chain = ctx.chain_slug().to_string();
    let caps = detect_capabilities(client.as_ref());
    let parent = SubscriptionHandle::new(ctx.label("substrate"));

    // Group assets by sub-adapter, keeping registry order
    let mut groups: Vec<(SubAdapter, Vec<ChainAsset>)> = Vec::new();
    let mut unsupported = Vec::new();
    for asset in &ctx.assets {
        match route_asset(&chain, asset) {
            Some(kind) => match groups.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, assets)) => assets.push(asset.clone()),
                None => groups.push((kind, vec![asset.clone()])),
            },
            None => unsupported.push(asset.clone()),
        }
    }

    if !unsupported.is_empty() {
        tracing::debug!(
            chain = %chain,
            count = unsupported.len(),
            "Assets not readable through Substrate pallets"
        );
        ctx.sink.emit(zero_items(&ctx.addresses, &unsupported, BalanceState::NotSupport));
    }

    for (kind, assets) in groups {
        let sub_ctx = ctx.with_assets(assets);
        let started = start_sub_adapter(kind, &sub_ctx, client.clone(), &caps);

        match started {
            Ok(handle) => parent.attach(handle),
            Err(e) => {
                tracing::warn!(
                    chain = %chain,
                    adapter = kind.name(),
                    "Sub-adapter not started: {}",
                    e
                );
            }
        }
    }

    Ok(parent)
}

fn start_sub_adapter(
    kind: SubAdapter,
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
    caps: &ChainCapabilities,
) -> Result<SubscriptionHandle, AdapterError> {
    match kind {
        SubAdapter::System => system::subscribe(ctx, client, caps),
        SubAdapter::Tokens => tokens::subscribe(ctx, client, StorageEntry::TokensAccounts),
        SubAdapter::OrmlTokens => tokens::subscribe(ctx, client, StorageEntry::OrmlTokensAccounts),
        SubAdapter::Assets => assets::subscribe(ctx, client),
        SubAdapter::ForeignAssets => foreign_assets::subscribe(ctx, client, caps),
        SubAdapter::Giga => giga::subscribe(ctx, client),
        SubAdapter::ContractTokens => contract_tokens::subscribe(ctx, client),
        SubAdapter::Subnet => subnet::subscribe(ctx, client),
    }
}

/// Subscribe to `queries` and emit `on_update(snapshot)` for every change.
///
/// Snapshots are processed in order, so a later emission for the same key always
/// supersedes an earlier one. Dropping the storage stream unsubscribes. If the
/// subscription cannot be opened, `unreadable` (zero READY records for the
/// watched keys) is emitted instead so the tokens still show up.
pub(crate) fn spawn_storage_watch<F, Fut>(
    handle: &SubscriptionHandle,
    sink: BalanceSink,
    client: Arc<dyn SubstrateClient>,
    queries: Vec<StorageQuery>,
    unreadable: Vec<BalanceItem>,
    timeout: std::time::Duration,
    mut on_update: F,
) where
    F: FnMut(StorageResults) -> Fut + Send + 'static,
    Fut: Future<Output = Vec<BalanceItem>> + Send + 'static,
{
    let label = handle.label().to_string();

    let task = tokio::spawn(async move {
        let mut stream = match timed_request(timeout, client.subscribe_storage(queries)).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(label = %label, "Storage subscription failed: {}", e);
                sink.emit(unreadable);
                return;
            }
        };

        while let Some(results) = stream.recv().await {
            if sink.is_closed() {
                break;
            }
            let items = on_update(results).await;
            if !sink.emit(items) {
                break;
            }
        }

        tracing::debug!(label = %label, "Storage subscription ended");
    });

    handle.add_task(task);
}

/// Storage key argument for a pallet-assets id: numeric when it parses, else verbatim
pub(crate) fn asset_id_arg(id: &str) -> serde_json::Value {
    match id.parse::<u64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(id),
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory Substrate client for adapter tests

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use balance_core::{Amount, ClientError};
    use chain_client::{ContractCall, RuntimeApi, RuntimeApiCall, SubstrateCall};
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;

    /// Serves storage values by query key; unknown keys read as null
    #[derive(Default)]
    pub struct MockSubstrate {
        pub chain: String,
        pub ready: bool,
        pub members: HashSet<(String, String)>,
        pub storage: Mutex<HashMap<String, Value>>,
        pub runtime_api: Mutex<HashMap<RuntimeApi, Value>>,
        pub contracts: Mutex<HashMap<String, Result<Amount, ClientError>>>,
        pub subscribed: Mutex<Vec<Vec<StorageQuery>>>,
        pub queried: Mutex<Vec<Vec<StorageQuery>>>,
        pub senders: Mutex<Vec<mpsc::Sender<StorageResults>>>,
        /// Reject every storage subscription with an RPC error
        pub subscribe_error: bool,
    }

    impl MockSubstrate {
        pub fn new(chain: &str) -> Self {
            Self {
                chain: chain.to_string(),
                ready: true,
                ..Default::default()
            }
        }

        pub fn with_member(mut self, pallet: &str, member: &str) -> Self {
            self.members.insert((pallet.to_string(), member.to_string()));
            self
        }

        pub fn set_storage(&self, entry: StorageEntry, args: Vec<Value>, value: Value) {
            let query = StorageQuery::new(entry, args);
            self.storage.lock().unwrap().insert(query.key, value);
        }

        pub fn set_runtime_api(&self, api: RuntimeApi, value: Value) {
            self.runtime_api.lock().unwrap().insert(api, value);
        }

        pub fn set_contract(&self, owner: &str, result: Result<Amount, ClientError>) {
            self.contracts.lock().unwrap().insert(owner.to_string(), result);
        }

        fn read(&self, queries: &[StorageQuery]) -> StorageResults {
            let storage = self.storage.lock().unwrap();
            queries
                .iter()
                .map(|q| {
                    let value = storage.get(&q.key).cloned().unwrap_or(Value::Null);
                    (q.key.clone(), value)
                })
                .collect()
        }

        /// Push a fresh snapshot to every open subscription
        pub async fn notify(&self) {
            let subscriptions = self.subscribed.lock().unwrap().clone();
            let senders = self.senders.lock().unwrap().clone();
            for (queries, tx) in subscriptions.iter().zip(senders) {
                let _ = tx.send(self.read(queries)).await;
            }
        }

        pub fn subscription_count(&self) -> usize {
            self.subscribed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SubstrateClient for MockSubstrate {
        fn chain_slug(&self) -> &str {
            &self.chain
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn wait_ready(&self) -> chain_client::Result<()> {
            Ok(())
        }

        fn has_pallet_member(&self, pallet: &str, member: &str) -> bool {
            self.members
                .contains(&(pallet.to_string(), member.to_string()))
        }

        async fn subscribe_storage(
            &self,
            queries: Vec<StorageQuery>,
        ) -> chain_client::Result<chain_client::StorageStream> {
            if self.subscribe_error {
                return Err(ClientError::Rpc {
                    message: "subscription rejected".to_string(),
                });
            }
            let (tx, rx) = mpsc::channel(16);
            let _ = tx.send(self.read(&queries)).await;
            self.subscribed.lock().unwrap().push(queries);
            self.senders.lock().unwrap().push(tx);
            Ok(rx)
        }

        async fn query_storage(
            &self,
            queries: Vec<StorageQuery>,
        ) -> chain_client::Result<StorageResults> {
            let results = self.read(&queries);
            self.queried.lock().unwrap().push(queries);
            Ok(results)
        }

        async fn call_runtime_api(&self, call: RuntimeApiCall) -> chain_client::Result<Value> {
            let apis = self.runtime_api.lock().unwrap();
            let value = apis.get(&call.api).cloned().ok_or(ClientError::Unsupported {
                feature: format!("{:?}", call.api),
            })?;
            // Per-account answers are keyed by the last string argument
            let account = call.args.iter().rev().find_map(Value::as_str);
            match (account, value.get(account.unwrap_or_default())) {
                (Some(_), Some(per_account)) => Ok(per_account.clone()),
                _ => Ok(value),
            }
        }

        async fn call_contract(&self, call: ContractCall) -> chain_client::Result<Amount> {
            self.contracts
                .lock()
                .unwrap()
                .get(&call.owner)
                .cloned()
                .unwrap_or_else(|| Ok(Amount::zero()))
        }

        async fn payment_info(
            &self,
            _call: &SubstrateCall,
            _sender: &str,
        ) -> chain_client::Result<Amount> {
            Ok(Amount::zero())
        }
    }
}
