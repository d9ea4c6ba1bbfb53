//! Read-only smart-contract token calls and response normalization
//!
//! Contract runtimes answer with either `{"ok": v}` or `{"Ok": v}` (and the
//! matching error casings) depending on the codec. `normalize_result` folds all of
//! them into one `Result` before any adapter looks at the value.

use balance_core::{Amount, ClientError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token standard of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStandard {
    /// ink! PSP22
    Psp22,
    /// Gear GRC-20
    Grc20,
    /// Gear sails VFT
    Vft,
}

impl ContractStandard {
    /// Message name used for the balance query
    pub fn balance_method(&self) -> &'static str {
        match self {
            Self::Psp22 => "psp22::balanceOf",
            Self::Grc20 => "BalanceOf",
            Self::Vft => "Vft/BalanceOf",
        }
    }
}

/// A read-only balance query against a token contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub standard: ContractStandard,
    pub contract_address: String,
    pub owner: String,
}

impl ContractCall {
    pub fn balance_of(
        standard: ContractStandard,
        contract_address: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            standard,
            contract_address: contract_address.into(),
            owner: owner.into(),
        }
    }
}

/// Fold `ok`/`Ok`/`err`/`Err` wrapped responses into a `Result`.
///
/// Values without a wrapper are returned as-is.
pub fn normalize_result(value: Value) -> Result<Value, ClientError> {
    if let Value::Object(map) = &value {
        if map.len() == 1 {
            if let Some(ok) = map.get("ok").or_else(|| map.get("Ok")) {
                return Ok(ok.clone());
            }
            if let Some(err) = map.get("err").or_else(|| map.get("Err")) {
                return Err(ClientError::CallFailed {
                    reason: match err {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                });
            }
        }
    }
    Ok(value)
}

/// Normalize a contract response and read it as an amount
pub fn contract_amount(value: Value) -> Result<Amount, ClientError> {
    let inner = normalize_result(value)?;
    // Nested results: ink! messages return Result<Result<T, E>, LangError>
    let inner = normalize_result(inner)?;
    Amount::from_json(&inner)
        .ok_or_else(|| ClientError::Decode(format!("Expected amount, got {}", inner)))
}
