//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ChainAsset, ChainInfo};

/// Timing and fee knobs for balance subscriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceConfig {
    /// EVM native/ERC-20 poll interval
    #[serde(default = "default_evm_poll_ms")]
    pub evm_poll_ms: u64,

    /// Smart-contract token (PSP22, GRC-20, VFT) poll interval
    #[serde(default = "default_contract_poll_ms")]
    pub contract_poll_ms: u64,

    /// Runtime-API poll interval (giga tokens, subnet stake)
    #[serde(default = "default_runtime_api_poll_ms")]
    pub runtime_api_poll_ms: u64,

    /// Bitcoin/TON/Cardano poll interval
    #[serde(default = "default_non_evm_poll_ms")]
    pub non_evm_poll_ms: u64,

    /// Delay before reading lock ledgers after an account update
    #[serde(default = "default_lock_read_delay_ms")]
    pub lock_read_delay_ms: u64,

    /// Timeout for a single chain client request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Safety multiplier applied to estimated XCM origin fees, in parts per
    /// million (1_500_000 = 1.5x)
    #[serde(default = "default_xcm_fee_ratio_ppm")]
    pub xcm_fee_ratio_ppm: u64,
}

fn default_evm_poll_ms() -> u64 {
    30_000
}

fn default_contract_poll_ms() -> u64 {
    30_000
}

fn default_runtime_api_poll_ms() -> u64 {
    30_000
}

fn default_non_evm_poll_ms() -> u64 {
    60_000
}

fn default_lock_read_delay_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_xcm_fee_ratio_ppm() -> u64 {
    crate::PPM_SCALE
}

impl BalanceConfig {
    pub fn evm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.evm_poll_ms)
    }

    pub fn contract_poll_interval(&self) -> Duration {
        Duration::from_millis(self.contract_poll_ms)
    }

    pub fn runtime_api_poll_interval(&self) -> Duration {
        Duration::from_millis(self.runtime_api_poll_ms)
    }

    pub fn non_evm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.non_evm_poll_ms)
    }

    pub fn lock_read_delay(&self) -> Duration {
        Duration::from_millis(self.lock_read_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            evm_poll_ms: default_evm_poll_ms(),
            contract_poll_ms: default_contract_poll_ms(),
            runtime_api_poll_ms: default_runtime_api_poll_ms(),
            non_evm_poll_ms: default_non_evm_poll_ms(),
            lock_read_delay_ms: default_lock_read_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            xcm_fee_ratio_ppm: default_xcm_fee_ratio_ppm(),
        }
    }
}

/// RPC endpoint for one chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Chain slug the endpoint serves
    pub chain: String,

    /// Endpoint URL (e.g., "https://eth.llamarpc.com")
    pub url: String,
}

/// Application configuration for the balance watcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Accounts to watch
    #[serde(default)]
    pub accounts: Vec<String>,

    /// EVM JSON-RPC endpoints
    #[serde(default)]
    pub evm_endpoints: Vec<EndpointConfig>,

    /// Chain registry
    #[serde(default)]
    pub chains: Vec<ChainInfo>,

    /// Asset registry
    #[serde(default)]
    pub assets: Vec<ChainAsset>,

    #[serde(default)]
    pub balance: BalanceConfig,
}

impl AppConfig {
    /// Parse from JSON text
    pub fn from_json(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
