//! chain-client: Capability traits for the chain clients balance adapters talk to
//!
//! Each chain family is represented by an object-safe async trait. The concrete
//! clients (Substrate, Bitcoin, TON, Cardano) live outside this workspace; a
//! JSON-RPC EVM client is provided here. Substrate runtimes are described by a
//! capability descriptor detected once from metadata.

pub mod bitcoin;
pub mod capabilities;
pub mod cardano;
pub mod contract;
pub mod evm;
pub mod queries;
pub mod substrate;
pub mod ton;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use balance_core::ClientError;

pub use bitcoin::{BitcoinAddressBalance, BitcoinClient, BitcoinFeeRates, Utxo};
pub use capabilities::{detect_capabilities, ChainCapabilities, NominationPoolsMode, XcmVersion};
pub use cardano::{CardanoClient, CardanoTransfer, LOVELACE_UNIT};
pub use contract::{contract_amount, normalize_result, ContractCall, ContractStandard};
pub use evm::{EvmClient, EvmFeeData, EvmTransaction, JsonRpcEvmClient};
pub use queries::{RuntimeApi, RuntimeApiCall, StorageEntry, StorageQuery, StorageResults};
pub use substrate::{StorageStream, SubstrateCall, SubstrateClient, XcmTransfer};
pub use ton::{TonClient, TonTransfer};

/// Result type for chain client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Chain clients available to a session, keyed by chain slug
#[derive(Clone, Default)]
pub struct ClientMaps {
    pub substrate: HashMap<String, Arc<dyn SubstrateClient>>,
    pub evm: HashMap<String, Arc<dyn EvmClient>>,
    pub bitcoin: HashMap<String, Arc<dyn BitcoinClient>>,
    pub ton: HashMap<String, Arc<dyn TonClient>>,
    pub cardano: HashMap<String, Arc<dyn CardanoClient>>,
}

impl ClientMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_substrate(mut self, client: Arc<dyn SubstrateClient>) -> Self {
        self.substrate.insert(client.chain_slug().to_string(), client);
        self
    }

    pub fn with_evm(mut self, client: Arc<dyn EvmClient>) -> Self {
        self.evm.insert(client.chain_slug().to_string(), client);
        self
    }

    pub fn with_bitcoin(mut self, client: Arc<dyn BitcoinClient>) -> Self {
        self.bitcoin.insert(client.chain_slug().to_string(), client);
        self
    }

    pub fn with_ton(mut self, client: Arc<dyn TonClient>) -> Self {
        self.ton.insert(client.chain_slug().to_string(), client);
        self
    }

    pub fn with_cardano(mut self, client: Arc<dyn CardanoClient>) -> Self {
        self.cardano.insert(client.chain_slug().to_string(), client);
        self
    }
}

/// Bound a client request by `timeout`, mapping errors into `ClientError`
pub async fn timed_request<T, E>(
    timeout: Duration,
    fut: impl std::future::Future<Output = std::result::Result<T, E>>,
) -> Result<T>
where
    E: Into<ClientError>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ClientError::Timeout {
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })?
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_request_passes_through() {
        let ok: Result<u32> =
            timed_request(Duration::from_secs(1), async { Ok::<_, ClientError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u32> = timed_request(Duration::from_secs(1), async {
            Err::<u32, _>(ClientError::Rpc {
                message: "boom".into(),
            })
        })
        .await;
        assert!(matches!(err, Err(ClientError::Rpc { .. })));
    }

    #[tokio::test]
    async fn test_timed_request_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<u32, ClientError>(1)
        };
        let result = timed_request(Duration::from_millis(10), slow).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { millis: 10 }));
        assert_eq!(err.to_string(), "Request timed out after 10ms");
    }
}
