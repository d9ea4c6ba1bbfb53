//! Bitcoin client capability

use async_trait::async_trait;
use balance_core::Amount;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Confirmed address totals as reported by an indexer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinAddressBalance {
    /// Sum of all outputs ever received
    pub funded: Amount,
    /// Sum of all outputs ever spent
    pub spent: Amount,
    /// Value of unspent outputs carrying inscriptions or runes
    #[serde(default)]
    pub inscription_value: Amount,
}

impl BitcoinAddressBalance {
    /// Spendable balance, excluding inscription-bound outputs
    pub fn spendable(&self) -> Amount {
        self.funded
            .saturating_sub(&self.spent)
            .saturating_sub(&self.inscription_value)
    }
}

/// Fee rates in sat/vB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinFeeRates {
    pub fast: u64,
    pub average: u64,
    pub slow: u64,
}

/// An unspent output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: Amount,
}

#[async_trait]
pub trait BitcoinClient: Send + Sync {
    fn chain_slug(&self) -> &str;

    async fn address_balance(&self, address: &str) -> Result<BitcoinAddressBalance>;

    async fn fee_rates(&self) -> Result<BitcoinFeeRates>;

    /// Spendable UTXOs (inscription-bound outputs excluded)
    async fn spendable_utxos(&self, address: &str) -> Result<Vec<Utxo>>;
}
