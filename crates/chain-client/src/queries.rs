//! Storage and runtime-API query tables
//!
//! Every pallet storage item and runtime API this workspace reads is named by an
//! enum variant mapped to its `(module, method)` pair, rather than by splitting
//! strings at call sites.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pallet storage entries read by balance adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageEntry {
    SystemAccount,
    BalancesLocks,
    BalancesHolds,
    BalancesFreezes,
    NominationPoolsPoolMembers,
    TokensAccounts,
    OrmlTokensAccounts,
    AssetsAccount,
    ForeignAssetsAccount,
    MultiTransactionPaymentAcceptedCurrencies,
}

impl StorageEntry {
    /// `(module, method)` as exposed by the runtime metadata
    pub fn pallet_method(&self) -> (&'static str, &'static str) {
        match self {
            Self::SystemAccount => ("system", "account"),
            Self::BalancesLocks => ("balances", "locks"),
            Self::BalancesHolds => ("balances", "holds"),
            Self::BalancesFreezes => ("balances", "freezes"),
            Self::NominationPoolsPoolMembers => ("nominationPools", "poolMembers"),
            Self::TokensAccounts => ("tokens", "accounts"),
            Self::OrmlTokensAccounts => ("ormlTokens", "accounts"),
            Self::AssetsAccount => ("assets", "account"),
            Self::ForeignAssetsAccount => ("foreignAssets", "account"),
            Self::MultiTransactionPaymentAcceptedCurrencies => {
                ("multiTransactionPayment", "acceptedCurrencies")
            }
        }
    }
}

/// One storage read: entry plus key arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageQuery {
    /// Key under which the result is returned
    pub key: String,
    pub entry: StorageEntry,
    pub args: Vec<Value>,
}

impl StorageQuery {
    pub fn new(entry: StorageEntry, args: Vec<Value>) -> Self {
        let (module, method) = entry.pallet_method();
        let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Self {
            key: format!("{}.{}({})", module, method, rendered.join(",")),
            entry,
            args,
        }
    }
}

/// Decoded results of a batched storage read, keyed by `StorageQuery::key`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageResults(HashMap<String, Value>);

impl StorageResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, query: &StorageQuery, value: Value) {
        self.0.insert(query.key.clone(), value);
    }

    /// Value for a query; absent entries read as `null`
    pub fn get(&self, query: &StorageQuery) -> &Value {
        self.0.get(&query.key).unwrap_or(&Value::Null)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for StorageResults {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Runtime APIs read by adapters and fee converters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeApi {
    /// Hydration currencies API; the only way to read some aToken balances
    CurrenciesAccount,
    /// Bittensor stake per (hotkey, netuid) for a coldkey
    StakeInfoForColdkey,
    /// Asset-conversion pool reserves for an asset pair
    AssetConversionReserves,
}

impl RuntimeApi {
    pub fn api_method(&self) -> (&'static str, &'static str) {
        match self {
            Self::CurrenciesAccount => ("currenciesApi", "account"),
            Self::StakeInfoForColdkey => ("stakeInfoRuntimeApi", "getStakeInfoForColdkey"),
            Self::AssetConversionReserves => ("assetConversionApi", "getReserves"),
        }
    }
}

/// A runtime API invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeApiCall {
    pub api: RuntimeApi,
    pub args: Vec<Value>,
}

impl RuntimeApiCall {
    pub fn new(api: RuntimeApi, args: Vec<Value>) -> Self {
        Self { api, args }
    }
}
