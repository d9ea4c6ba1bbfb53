//! TON client capability

use async_trait::async_trait;
use balance_core::Amount;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Outgoing message used for fee estimation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonTransfer {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    /// Jetton master for TEP-74 transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jetton_master: Option<String>,
}

#[async_trait]
pub trait TonClient: Send + Sync {
    fn chain_slug(&self) -> &str;

    async fn native_balance(&self, address: &str) -> Result<Amount>;

    /// Balance of the owner's jetton wallet for a jetton master
    async fn jetton_balance(&self, owner: &str, jetton_master: &str) -> Result<Amount>;

    async fn estimate_fee(&self, transfer: &TonTransfer) -> Result<Amount>;
}
