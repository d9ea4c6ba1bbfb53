//! Fee State Types
//!
//! Transfer requests, per-family fee quotes and calculator results.

use balance_core::{Amount, ChainAsset, ChainFamily, ChainInfo, TokenSlug, TxTypeHint};
use serde::{Deserialize, Serialize};

use crate::constants::bridges;

/// A pending transfer to price
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Sender address
    pub address: String,
    pub chain: ChainInfo,
    /// Token being transferred
    pub token: ChainAsset,
    /// Native token of `chain`
    pub native_token: ChainAsset,
    /// Destination chain for cross-chain transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_chain: Option<ChainInfo>,
    /// Token received on the destination chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_token: Option<ChainAsset>,
    /// Chain holding the reserve of `token`, when it is neither source nor destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_chain: Option<String>,
    /// Token paying the fee, when not the native token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_token: Option<TokenSlug>,
    #[serde(default)]
    pub transfer_all: bool,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: bool,
}

fn default_keep_alive() -> bool {
    true
}

impl TransferRequest {
    pub fn is_cross_chain(&self) -> bool {
        self.dest_chain
            .as_ref()
            .is_some_and(|dest| dest.slug != self.chain.slug)
    }

    /// Fee is paid in the transferred (non-native) token
    pub fn pays_fee_in_token(&self) -> bool {
        !self.token.is_native() && self.fee_token.as_ref() == Some(&self.token.slug)
    }

    /// Balance hint matching this transfer, for subscribing to the free balance
    /// the calculator should be given.
    ///
    /// A reaping transfer-all may spend the existential deposit too.
    pub fn balance_hint(&self) -> TxTypeHint {
        match (self.transfer_all && !self.keep_alive, self.token.is_native()) {
            (true, _) => TxTypeHint::TransferAll,
            (false, true) => TxTypeHint::TransferBalance,
            (false, false) => TxTypeHint::TransferToken,
        }
    }

    /// Multi-hop XCM: the token's reserve is a third chain
    pub fn is_multi_hop(&self) -> bool {
        match (&self.reserve_chain, &self.dest_chain) {
            (Some(reserve), Some(dest)) => reserve != &self.chain.slug && reserve != &dest.slug,
            _ => false,
        }
    }

    /// Bridge route for cross-chain transfers
    pub fn route(&self) -> Option<BridgeRoute> {
        let dest = self.dest_chain.as_ref().filter(|_| self.is_cross_chain())?;
        Some(BridgeRoute::detect(&self.chain.slug, &dest.slug))
    }
}

/// How a cross-chain transfer leaves the source chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BridgeRoute {
    PolygonBridge,
    PosBridge,
    AvailBridge,
    Snowbridge,
    Xcm,
}

impl BridgeRoute {
    pub fn detect(src: &str, dest: &str) -> Self {
        let on = |table: &[(&str, &str)]| table.iter().any(|(s, d)| *s == src && *d == dest);

        if on(bridges::POLYGON_BRIDGE) {
            Self::PolygonBridge
        } else if on(bridges::POS_BRIDGE) {
            Self::PosBridge
        } else if on(bridges::AVAIL_BRIDGE) {
            Self::AvailBridge
        } else if on(bridges::SNOWBRIDGE) {
            Self::Snowbridge
        } else {
            Self::Xcm
        }
    }
}

/// Fee family reported alongside the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeChainType {
    Evm,
    Substrate,
    Bitcoin,
    Ton,
    Cardano,
}

impl From<ChainFamily> for FeeChainType {
    fn from(family: ChainFamily) -> Self {
        match family {
            ChainFamily::Evm => Self::Evm,
            ChainFamily::Substrate => Self::Substrate,
            ChainFamily::Bitcoin => Self::Bitcoin,
            ChainFamily::Ton => Self::Ton,
            ChainFamily::Cardano => Self::Cardano,
        }
    }
}

/// EVM fee options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmFeeOptions {
    pub gas_limit: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<Amount>,
    pub estimated_fee: Amount,
}

impl EvmFeeOptions {
    /// Per-gas price the caller asked for, if any
    pub fn price(&self) -> Option<&Amount> {
        self.max_fee_per_gas.as_ref().or(self.gas_price.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateFeeOptions {
    #[serde(default)]
    pub tip: Amount,
    pub estimated_fee: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinFeeOptions {
    /// sat/vB
    pub fee_rate: u64,
    pub vsize: u64,
    pub estimated_fee: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleFeeOptions {
    pub estimated_fee: Amount,
}

/// Chain-family specific fee shape; the estimated fee is always present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeeQuote {
    Evm(EvmFeeOptions),
    Substrate(SubstrateFeeOptions),
    Bitcoin(BitcoinFeeOptions),
    Ton(SimpleFeeOptions),
    Cardano(SimpleFeeOptions),
}

impl FeeQuote {
    pub fn fee_type(&self) -> FeeChainType {
        match self {
            Self::Evm(_) => FeeChainType::Evm,
            Self::Substrate(_) => FeeChainType::Substrate,
            Self::Bitcoin(_) => FeeChainType::Bitcoin,
            Self::Ton(_) => FeeChainType::Ton,
            Self::Cardano(_) => FeeChainType::Cardano,
        }
    }

    pub fn estimated_fee(&self) -> &Amount {
        match self {
            Self::Evm(o) => &o.estimated_fee,
            Self::Substrate(o) => &o.estimated_fee,
            Self::Bitcoin(o) => &o.estimated_fee,
            Self::Ton(o) | Self::Cardano(o) => &o.estimated_fee,
        }
    }

    /// Zero-fee quote for `fee_type`, keeping the caller's price preferences
    pub fn zero(fee_type: FeeChainType, preference: Option<&FeeQuote>) -> Self {
        match (fee_type, preference) {
            (FeeChainType::Evm, Some(Self::Evm(pref))) => Self::Evm(EvmFeeOptions {
                gas_limit: Amount::zero(),
                estimated_fee: Amount::zero(),
                ..pref.clone()
            }),
            (FeeChainType::Evm, _) => Self::Evm(EvmFeeOptions::default()),
            (FeeChainType::Substrate, Some(Self::Substrate(pref))) => {
                Self::Substrate(SubstrateFeeOptions {
                    tip: pref.tip.clone(),
                    estimated_fee: Amount::zero(),
                })
            }
            (FeeChainType::Substrate, _) => Self::Substrate(SubstrateFeeOptions::default()),
            (FeeChainType::Bitcoin, Some(Self::Bitcoin(pref))) => Self::Bitcoin(BitcoinFeeOptions {
                fee_rate: pref.fee_rate,
                vsize: 0,
                estimated_fee: Amount::zero(),
            }),
            (FeeChainType::Bitcoin, _) => Self::Bitcoin(BitcoinFeeOptions::default()),
            (FeeChainType::Ton, _) => Self::Ton(SimpleFeeOptions::default()),
            (FeeChainType::Cardano, _) => Self::Cardano(SimpleFeeOptions::default()),
        }
    }
}

/// Calculator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxTransferableResult {
    pub max_transferable: Amount,
    pub fee_options: FeeQuote,
    pub fee_type: FeeChainType,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_detection() {
        assert_eq!(BridgeRoute::detect("ethereum", "polygon"), BridgeRoute::PosBridge);
        assert_eq!(BridgeRoute::detect("ethereum", "polygonzkEvm"), BridgeRoute::PolygonBridge);
        assert_eq!(BridgeRoute::detect("avail_mainnet", "ethereum"), BridgeRoute::AvailBridge);
        assert_eq!(BridgeRoute::detect("statemint", "ethereum"), BridgeRoute::Snowbridge);
        assert_eq!(BridgeRoute::detect("polkadot", "statemint"), BridgeRoute::Xcm);
    }

    #[test]
    fn test_fee_quote_serialization() {
        let quote = FeeQuote::zero(FeeChainType::Evm, None);
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["type"], "evm");
        assert_eq!(json["estimatedFee"], "0");
        assert_eq!(json["gasLimit"], "0");

        let parsed: FeeQuote = serde_json::from_value(serde_json::json!({
            "type": "substrate",
            "tip": "10",
            "estimatedFee": "120"
        }))
        .unwrap();
        assert_eq!(parsed.estimated_fee(), &Amount::from(120u64));
        assert_eq!(parsed.fee_type(), FeeChainType::Substrate);
    }

    #[test]
    fn test_zero_keeps_price_preference() {
        let pref = FeeQuote::Evm(EvmFeeOptions {
            gas_limit: Amount::from(21_000u64),
            gas_price: Some(Amount::from(7u64)),
            estimated_fee: Amount::from(147_000u64),
            ..Default::default()
        });
        let FeeQuote::Evm(zero) = FeeQuote::zero(FeeChainType::Evm, Some(&pref)) else {
            panic!("expected evm quote");
        };
        assert!(zero.gas_limit.is_zero());
        assert!(zero.estimated_fee.is_zero());
        assert_eq!(zero.gas_price, Some(Amount::from(7u64)));
    }
}
