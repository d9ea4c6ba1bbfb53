//! Core type definitions: balance records, asset and chain descriptors

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Asset slug (e.g. "polkadot-NATIVE-DOT")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSlug(pub String);

impl TokenSlug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Freshness of a balance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceState {
    /// Read from chain in this session
    Ready,
    /// Chain client not ready yet; zero placeholder
    Pending,
    /// Address format or asset type not supported on this chain
    NotSupport,
    /// Restored from a previous session by the caller
    Cached,
}

impl BalanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Pending => "PENDING",
            Self::NotSupport => "NOT_SUPPORT",
            Self::Cached => "CACHED",
        }
    }
}

/// Breakdown of the locked part of a balance into named buckets
///
/// `others` is the residual not explained by the named buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedBalanceDetails {
    pub staking: Amount,
    pub governance: Amount,
    pub democracy: Amount,
    pub reserved: Amount,
    pub others: Amount,
}

/// Point-in-time balance snapshot for one (address, token) pair
///
/// Later snapshots for the same key replace earlier ones; they are never deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceItem {
    pub address: String,
    pub token_slug: TokenSlug,
    /// Transferable amount in minor units
    pub free: Amount,
    /// Amount locked from transfer in minor units
    pub locked: Amount,
    pub state: BalanceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_details: Option<LockedBalanceDetails>,
    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl BalanceItem {
    /// A READY snapshot stamped with the current time
    pub fn ready(
        address: impl Into<String>,
        token_slug: TokenSlug,
        free: Amount,
        locked: Amount,
    ) -> Self {
        Self {
            address: address.into(),
            token_slug,
            free,
            locked,
            state: BalanceState::Ready,
            locked_details: None,
            timestamp: Some(now_millis()),
        }
    }

    /// A zero-balance record in the given state
    pub fn zero(address: impl Into<String>, token_slug: TokenSlug, state: BalanceState) -> Self {
        Self {
            address: address.into(),
            token_slug,
            free: Amount::zero(),
            locked: Amount::zero(),
            state,
            locked_details: None,
            timestamp: Some(now_millis()),
        }
    }

    pub fn with_locked_details(mut self, details: LockedBalanceDetails) -> Self {
        self.locked_details = Some(details);
        self
    }

    /// Key under which callers should store this snapshot
    pub fn key(&self) -> (&str, &TokenSlug) {
        (&self.address, &self.token_slug)
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// On-chain representation of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Native,
    /// Pallet-managed token (ORML tokens, pallet-assets, foreign assets, subnet tokens)
    Local,
    Erc20,
    Erc721,
    Psp22,
    Psp34,
    /// Gear VM fungible token
    Grc20,
    /// Gear VM "VFT" fungible token (sails)
    Vft,
    /// TEP-74 jetton
    TonJetton,
    /// CIP-26 native asset
    Cardano,
    Runes,
    Brc20,
}

impl AssetType {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Non-fungible standards never carry a balance
    pub fn is_nft(&self) -> bool {
        matches!(self, Self::Erc721 | Self::Psp34)
    }
}

/// Chain-specific identifiers needed to read an asset's balance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    /// Token contract (EVM, ink!, Gear, jetton master)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// ORML currency id, e.g. `{"Token": "KAR"}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_chain_info: Option<serde_json::Value>,
    /// pallet-assets / foreign-assets numeric id; "-1" marks an unresolvable id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    /// XCM location in V4 form (junction arrays)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multilocation: Option<serde_json::Value>,
    /// Bittensor subnet id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netuid: Option<u16>,
    /// Balance is only readable through the currencies runtime API
    #[serde(default)]
    pub runtime_api_balance: bool,
    /// Cardano asset unit (policy id + hex asset name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id_and_name: Option<String>,
}

/// Asset descriptor from the registry
///
/// Immutable for the lifetime of a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAsset {
    pub slug: TokenSlug,
    pub origin_chain: String,
    pub asset_type: AssetType,
    pub symbol: String,
    pub decimals: u8,
    /// Existential deposit in minor units
    #[serde(default)]
    pub min_amount: Amount,
    #[serde(default)]
    pub metadata: AssetMetadata,
}

impl ChainAsset {
    pub fn is_native(&self) -> bool {
        self.asset_type.is_native()
    }

    /// Pallet-assets / foreign-assets id, unless it is the "-1" sentinel
    pub fn resolved_asset_id(&self) -> Option<&str> {
        self.metadata
            .asset_id
            .as_deref()
            .filter(|id| *id != "-1" && !id.is_empty())
    }
}

/// Substrate-side chain information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateInfo {
    pub address_prefix: u16,
    /// Accounts are 20-byte Ethereum-style keys (e.g. Moonbeam)
    #[serde(default)]
    pub uses_ethereum_accounts: bool,
    /// Relay chain this chain is attached to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmInfo {
    pub chain_id: u64,
}

/// Bitcoin network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    #[default]
    Mainnet,
    Testnet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinInfo {
    #[serde(default)]
    pub network: BitcoinNetwork,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonInfo {
    #[serde(default)]
    pub is_testnet: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardanoInfo {
    #[serde(default)]
    pub is_testnet: bool,
}

/// Chain descriptor from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substrate: Option<SubstrateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm: Option<EvmInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitcoin: Option<BitcoinInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ton: Option<TonInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardano: Option<CardanoInfo>,
}

impl ChainInfo {
    /// Classify the chain into exactly one family.
    ///
    /// Priority: EVM-only, TON, Cardano, Bitcoin, then Substrate for everything
    /// else (including hybrid Substrate+EVM chains).
    pub fn family(&self) -> ChainFamily {
        if self.evm.is_some() && self.substrate.is_none() {
            ChainFamily::Evm
        } else if self.ton.is_some() {
            ChainFamily::Ton
        } else if self.cardano.is_some() {
            ChainFamily::Cardano
        } else if self.bitcoin.is_some() {
            ChainFamily::Bitcoin
        } else {
            ChainFamily::Substrate
        }
    }
}

/// Chain family an adapter is selected by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Substrate,
    Bitcoin,
    Ton,
    Cardano,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Substrate => "substrate",
            Self::Bitcoin => "bitcoin",
            Self::Ton => "ton",
            Self::Cardano => "cardano",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hint about the transaction the balance will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxTypeHint {
    TransferBalance,
    TransferToken,
    /// Transfer everything, allowing the account to be reaped
    TransferAll,
    Staking,
}

/// Existential deposit withheld from the transferable balance for a transaction type.
///
/// Reaping transfers and staking operations do not need to keep the ED free.
pub fn applied_existential_deposit(ed: &Amount, hint: Option<TxTypeHint>) -> Amount {
    match hint {
        Some(TxTypeHint::TransferAll) | Some(TxTypeHint::Staking) => Amount::zero(),
        _ => ed.clone(),
    }
}
