//! Public entry points
//!
//! A subscription session owns one `SubscriptionHandle`. Adapters push into a
//! shared sink; a forwarder task drains it into the caller's callback, checking
//! the session flag before every invocation so nothing is delivered after
//! `cancel()`.

use std::sync::Arc;

use balance_core::{BalanceConfig, BalanceItem, ChainAsset, ChainInfo, TokenSlug, TxTypeHint};
use chain_client::ClientMaps;

use crate::address::{AddressFormat, DefaultAddressFormat};
use crate::dispatcher::{Dispatcher, SubscribeRequest};
use crate::handle::SubscriptionHandle;
use crate::registry::Registry;
use crate::sink::{BalanceSink, BalanceStream};

/// Receives every batch of balance records pushed by a session
pub type BalanceCallback = Arc<dyn Fn(Vec<BalanceItem>) + Send + Sync>;

/// Starts balance subscriptions against a fixed registry and client set
pub struct BalanceService {
    dispatcher: Dispatcher,
}

impl BalanceService {
    pub fn new(registry: Registry, clients: ClientMaps, config: BalanceConfig) -> Self {
        Self {
            dispatcher: Dispatcher {
                registry: Arc::new(registry),
                clients,
                config: Arc::new(config),
                address_format: Arc::new(DefaultAddressFormat),
            },
        }
    }

    /// Replace the address-format rules used to split compatible addresses
    pub fn with_address_format(mut self, format: Arc<dyn AddressFormat>) -> Self {
        self.dispatcher.address_format = format;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.dispatcher.registry
    }

    /// Start a session that pushes every batch into `callback`.
    ///
    /// Must be called from within a tokio runtime. Records that need no network
    /// call (NOT_SUPPORT for incompatible addresses, PENDING for clients still
    /// connecting) are delivered before this returns.
    pub fn subscribe(&self, request: SubscribeRequest, callback: BalanceCallback) -> SubscriptionHandle {
        let session = SubscriptionHandle::new("balance-session");
        let (sink, mut rx) = BalanceSink::channel(&session);

        let flag = session.flag();
        let immediate = {
            let callback = callback.clone();
            let flag = flag.clone();
            move |items: Vec<BalanceItem>| {
                if !items.is_empty() && !flag.is_cancelled() {
                    callback(items);
                }
            }
        };

        self.start(&request, &session, &sink, &immediate);

        let forwarder = tokio::spawn(async move {
            while let Some(items) = rx.recv().await {
                if flag.is_cancelled() {
                    break;
                }
                callback(items);
            }
        });
        session.add_task(forwarder);

        session
    }

    /// Start a session whose batches are read from the returned stream.
    ///
    /// Immediate records are the first batches on the stream. The stream ends
    /// once the handle is cancelled and every adapter task has stopped.
    pub fn subscribe_stream(&self, request: SubscribeRequest) -> (SubscriptionHandle, BalanceStream) {
        let session = SubscriptionHandle::new("balance-session");
        let (sink, rx) = BalanceSink::channel(&session);

        let immediate = {
            let sink = sink.clone();
            move |items: Vec<BalanceItem>| {
                sink.emit(items);
            }
        };
        self.start(&request, &session, &sink, &immediate);

        (session, rx)
    }

    fn start(
        &self,
        request: &SubscribeRequest,
        session: &SubscriptionHandle,
        sink: &BalanceSink,
        immediate: &(dyn Fn(Vec<BalanceItem>) + Send + Sync),
    ) {
        tracing::info!(
            addresses = request.addresses.len(),
            chains = request.chains.len(),
            tokens = request.tokens.len(),
            "Starting balance subscription"
        );
        self.dispatcher.start(request, session, sink, immediate);
    }
}

/// One-shot form of [`BalanceService::subscribe`] over plain registries.
#[allow(clippy::too_many_arguments)]
pub fn subscribe_balance(
    addresses: Vec<String>,
    chains: Vec<String>,
    tokens: Vec<TokenSlug>,
    assets: Vec<ChainAsset>,
    chain_registry: Vec<ChainInfo>,
    clients: ClientMaps,
    callback: BalanceCallback,
    tx_hint: Option<TxTypeHint>,
) -> SubscriptionHandle {
    BalanceService::new(Registry::new(chain_registry, assets), clients, BalanceConfig::default())
        .subscribe(
            SubscribeRequest {
                addresses,
                chains,
                tokens,
                tx_hint,
            },
            callback,
        )
}

/// Stream form of [`subscribe_balance`]
pub fn subscribe_balance_stream(
    request: SubscribeRequest,
    assets: Vec<ChainAsset>,
    chain_registry: Vec<ChainInfo>,
    clients: ClientMaps,
) -> (SubscriptionHandle, BalanceStream) {
    BalanceService::new(Registry::new(chain_registry, assets), clients, BalanceConfig::default())
        .subscribe_stream(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use balance_core::{Amount, AssetType, BalanceState, EvmInfo, SubstrateInfo};
    use chain_client::StorageEntry;
    use serde_json::json;

    use crate::adapters::evm::mock::MockEvm;
    use crate::adapters::substrate::mock::MockSubstrate;
    use crate::adapters::testing::{asset, chain};

    const SUBSTRATE_ADDR: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
    const EVM_ADDR: &str = "0x1111111111111111111111111111111111111111";

    fn substrate_chain(slug: &str) -> ChainInfo {
        ChainInfo {
            substrate: Some(SubstrateInfo::default()),
            ..chain(slug)
        }
    }

    fn evm_chain(slug: &str) -> ChainInfo {
        ChainInfo {
            evm: Some(EvmInfo { chain_id: 1 }),
            ..chain(slug)
        }
    }

    fn fast_config() -> BalanceConfig {
        BalanceConfig {
            evm_poll_ms: 20,
            contract_poll_ms: 20,
            runtime_api_poll_ms: 20,
            non_evm_poll_ms: 20,
            lock_read_delay_ms: 1,
            request_timeout_ms: 500,
            ..Default::default()
        }
    }

    /// Callback collecting every batch into a shared vec
    fn collector() -> (BalanceCallback, Arc<Mutex<Vec<BalanceItem>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: BalanceCallback = Arc::new(move |items| sink.lock().unwrap().extend(items));
        (callback, seen)
    }

    async fn wait_for(seen: &Arc<Mutex<Vec<BalanceItem>>>, pred: impl Fn(&[BalanceItem]) -> bool) {
        for _ in 0..100 {
            if pred(&seen.lock().unwrap()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_incompatible_addresses_are_reported_before_returning() {
        let evm = Arc::new(MockEvm::new("ethereum"));
        evm.native.lock().unwrap().insert(EVM_ADDR.into(), Amount::from(7u64));

        let service = BalanceService::new(
            Registry::new(
                vec![evm_chain("ethereum")],
                vec![asset("ethereum-NATIVE-ETH", "ethereum", AssetType::Native, 0)],
            ),
            ClientMaps::new().with_evm(evm.clone()),
            fast_config(),
        );

        let (callback, seen) = collector();
        let handle = service.subscribe(
            SubscribeRequest {
                addresses: vec![SUBSTRATE_ADDR.into(), EVM_ADDR.into()],
                chains: vec!["ethereum".into()],
                ..Default::default()
            },
            callback,
        );

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].address, SUBSTRATE_ADDR);
            assert_eq!(seen[0].state, BalanceState::NotSupport);
        }

        wait_for(&seen, |items| {
            items
                .iter()
                .any(|i| i.address == EVM_ADDR && i.state == BalanceState::Ready)
        })
        .await;
        handle.cancel();
    }

    #[tokio::test]
    async fn test_pending_then_ready_for_connecting_client() {
        let client = MockSubstrate {
            ready: false,
            ..MockSubstrate::new("polkadot")
        };
        client.set_storage(
            StorageEntry::SystemAccount,
            vec![json!(SUBSTRATE_ADDR)],
            json!({"data": {"free": 100, "reserved": 0, "frozen": 0}}),
        );

        let service = BalanceService::new(
            Registry::new(
                vec![substrate_chain("polkadot")],
                vec![asset("polkadot-NATIVE-DOT", "polkadot", AssetType::Native, 1)],
            ),
            ClientMaps::new().with_substrate(Arc::new(client)),
            fast_config(),
        );

        let (callback, seen) = collector();
        let handle = service.subscribe(
            SubscribeRequest {
                addresses: vec![SUBSTRATE_ADDR.into()],
                chains: vec!["polkadot".into()],
                ..Default::default()
            },
            callback,
        );

        assert_eq!(seen.lock().unwrap()[0].state, BalanceState::Pending);

        wait_for(&seen, |items| {
            items
                .iter()
                .any(|i| i.state == BalanceState::Ready && i.free == Amount::from(99u64))
        })
        .await;
        handle.cancel();
    }

    #[tokio::test]
    async fn test_cancel_stops_callbacks_and_is_idempotent() {
        let evm = Arc::new(MockEvm::new("ethereum"));
        evm.native.lock().unwrap().insert(EVM_ADDR.into(), Amount::from(1u64));

        let (callback, seen) = collector();
        let handle = subscribe_balance(
            vec![EVM_ADDR.into()],
            vec!["ethereum".into()],
            Vec::new(),
            vec![asset("ethereum-NATIVE-ETH", "ethereum", AssetType::Native, 0)],
            vec![evm_chain("ethereum")],
            ClientMaps::new().with_evm(evm.clone()),
            callback,
            None,
        );

        wait_for(&seen, |items| !items.is_empty()).await;
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        let count = seen.lock().unwrap().len();
        let calls = evm.call_count();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen.lock().unwrap().len(), count);
        assert!(evm.call_count() <= calls + 1);
    }

    #[tokio::test]
    async fn test_unknown_chain_and_missing_client_emit_nothing() {
        let service = BalanceService::new(
            Registry::new(
                vec![evm_chain("ethereum")],
                vec![asset("ethereum-NATIVE-ETH", "ethereum", AssetType::Native, 0)],
            ),
            ClientMaps::new(),
            fast_config(),
        );

        let (handle, mut rx) = service.subscribe_stream(SubscribeRequest {
            addresses: vec![EVM_ADDR.into()],
            chains: vec!["ethereum".into(), "nowhere".into()],
            ..Default::default()
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_hybrid_chain_routes_erc20_to_evm_client() {
        let substrate = Arc::new(MockSubstrate::new("moonbeam"));
        let evm = Arc::new(MockEvm::new("moonbeam"));
        evm.erc20
            .lock()
            .unwrap()
            .insert(("0xtoken".into(), EVM_ADDR.into()), Amount::from(42u64));

        let mut token = asset("moonbeam-ERC20-USDC", "moonbeam", AssetType::Erc20, 0);
        token.metadata.contract_address = Some("0xtoken".into());

        let hybrid = ChainInfo {
            substrate: Some(SubstrateInfo {
                uses_ethereum_accounts: true,
                ..Default::default()
            }),
            evm: Some(EvmInfo { chain_id: 1284 }),
            ..chain("moonbeam")
        };

        let service = BalanceService::new(
            Registry::new(vec![hybrid], vec![token]),
            ClientMaps::new().with_substrate(substrate.clone()).with_evm(evm),
            fast_config(),
        );

        let (handle, mut rx) = service.subscribe_stream(SubscribeRequest {
            addresses: vec![EVM_ADDR.into()],
            chains: vec!["moonbeam".into()],
            ..Default::default()
        });

        let batch = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch[0].free, Amount::from(42u64));
        assert_eq!(substrate.subscription_count(), 0);
        handle.cancel();
    }
}
