//! Cardano client capability

use std::collections::HashMap;

use async_trait::async_trait;
use balance_core::Amount;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Unit name of the native coin in address balance maps
pub const LOVELACE_UNIT: &str = "lovelace";

/// Transfer used for fee estimation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardanoTransfer {
    pub from: String,
    pub to: String,
    /// Asset unit; `lovelace` for ADA
    pub unit: String,
    pub amount: Amount,
}

#[async_trait]
pub trait CardanoClient: Send + Sync {
    fn chain_slug(&self) -> &str;

    /// Quantities per asset unit held by the address
    async fn address_balances(&self, address: &str) -> Result<HashMap<String, Amount>>;

    async fn estimate_fee(&self, transfer: &CardanoTransfer) -> Result<Amount>;
}
