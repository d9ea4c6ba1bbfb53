//! Substrate client capability

use async_trait::async_trait;
use balance_core::{Amount, ClientError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::contract::ContractCall;
use crate::queries::{RuntimeApiCall, StorageQuery, StorageResults};
use crate::Result;

/// Stream of storage snapshots; dropping the receiver unsubscribes
pub type StorageStream = mpsc::Receiver<StorageResults>;

/// An extrinsic described by pallet and call name, used for fee estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateCall {
    pub pallet: String,
    pub method: String,
    pub args: Vec<Value>,
}

impl SubstrateCall {
    pub fn new(pallet: &str, method: &str, args: Vec<Value>) -> Self {
        Self {
            pallet: pallet.to_string(),
            method: method.to_string(),
            args,
        }
    }
}

/// A cross-chain transfer to dry-run for fee estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XcmTransfer {
    pub origin_chain: String,
    pub dest_chain: String,
    /// Asset location in V4 form
    pub asset_location: Value,
    pub amount: Amount,
    pub sender: String,
    pub recipient: String,
}

/// Capabilities a Substrate chain client exposes to this workspace
#[async_trait]
pub trait SubstrateClient: Send + Sync {
    fn chain_slug(&self) -> &str;

    /// Connected and metadata loaded
    fn is_ready(&self) -> bool;

    /// Resolves once the client is ready
    async fn wait_ready(&self) -> Result<()>;

    /// Whether runtime metadata lists a storage item, call or constant
    fn has_pallet_member(&self, pallet: &str, member: &str) -> bool;

    /// Subscribe to a batch of storage entries; a snapshot of every entry is
    /// pushed whenever any of them changes
    async fn subscribe_storage(&self, queries: Vec<StorageQuery>) -> Result<StorageStream>;

    /// One-shot batched storage read
    async fn query_storage(&self, queries: Vec<StorageQuery>) -> Result<StorageResults>;

    async fn call_runtime_api(&self, call: RuntimeApiCall) -> Result<Value>;

    /// Read-only token contract call, already normalized into an amount
    async fn call_contract(&self, call: ContractCall) -> Result<Amount>;

    /// Partial fee for an extrinsic signed by `sender`
    async fn payment_info(&self, call: &SubstrateCall, sender: &str) -> Result<Amount>;

    /// Origin-side fee of a multi-hop XCM transfer via dry-run
    async fn estimate_xcm_fee(&self, _transfer: &XcmTransfer) -> Result<Amount> {
        Err(ClientError::Unsupported {
            feature: "xcm dry-run".to_string(),
        })
    }
}
