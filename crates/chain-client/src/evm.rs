//! EVM client capability and a JSON-RPC implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use balance_core::{Amount, ClientError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{timed_request, Result};

/// `balanceOf(address)` selector
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// `transfer(address,uint256)` selector
const TRANSFER_SELECTOR: &str = "a9059cbb";

/// Gas market snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmFeeData {
    /// Legacy gas price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<Amount>,
}

impl EvmFeeData {
    /// Per-gas price a transaction would pay: `2 * baseFee + tip` on EIP-1559
    /// chains, the legacy gas price otherwise
    pub fn effective_gas_price(&self) -> Option<Amount> {
        match (&self.base_fee_per_gas, &self.max_priority_fee_per_gas) {
            (Some(base), tip) => {
                let tip = tip.clone().unwrap_or_default();
                Some(base + base + tip)
            }
            (None, _) => self.gas_price.clone(),
        }
    }
}

/// Unsigned transaction used for gas estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmTransaction {
    pub from: String,
    pub to: String,
    pub value: Amount,
    /// `0x`-prefixed calldata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Capabilities an EVM chain client exposes to this workspace
#[async_trait]
pub trait EvmClient: Send + Sync {
    fn chain_slug(&self) -> &str;

    async fn native_balance(&self, address: &str) -> Result<Amount>;

    async fn erc20_balance(&self, contract: &str, owner: &str) -> Result<Amount>;

    async fn fee_data(&self) -> Result<EvmFeeData>;

    async fn estimate_gas(&self, tx: &EvmTransaction) -> Result<Amount>;
}

/// Left-pad a 20-byte address into a 32-byte ABI word
fn encode_address_word(address: &str) -> Result<String> {
    let stripped = address.trim_start_matches("0x");
    let bytes = hex::decode(stripped).map_err(|e| ClientError::Decode(format!(
        "Invalid EVM address {}: {}",
        address, e
    )))?;
    if bytes.len() != 20 {
        return Err(ClientError::Decode(format!(
            "EVM address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(format!("{:0>64}", hex::encode(bytes)))
}

/// Calldata for `balanceOf(owner)`
pub fn encode_balance_of(owner: &str) -> Result<String> {
    Ok(format!("0x{}{}", BALANCE_OF_SELECTOR, encode_address_word(owner)?))
}

/// Calldata for `transfer(to, amount)`
pub fn encode_erc20_transfer(to: &str, amount: &Amount) -> Result<String> {
    let amount_hex = amount.as_biguint().to_str_radix(16);
    if amount_hex.len() > 64 {
        return Err(ClientError::Decode("Amount exceeds uint256".to_string()));
    }
    Ok(format!(
        "0x{}{}{:0>64}",
        TRANSFER_SELECTOR,
        encode_address_word(to)?,
        amount_hex
    ))
}

/// Decode a hex quantity or ABI word returned by the node
fn decode_quantity(value: &Value) -> Result<Amount> {
    let s = value
        .as_str()
        .ok_or_else(|| ClientError::Decode(format!("Expected hex string, got {}", value)))?;
    if s == "0x" {
        return Ok(Amount::zero());
    }
    s.parse()
        .map_err(|e| ClientError::Decode(format!("{}", e)))
}

/// JSON-RPC request envelope
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// EVM client over HTTP JSON-RPC
#[derive(Clone)]
pub struct JsonRpcEvmClient {
    chain: String,
    url: String,
    http: reqwest::Client,
    timeout: Duration,
    next_id: std::sync::Arc<AtomicU64>,
}

impl JsonRpcEvmClient {
    pub fn new(chain: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            chain: chain.into(),
            url: url.into(),
            http: reqwest::Client::new(),
            timeout,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let send = async {
            let response = self
                .http
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ClientError::Rpc {
                    message: format!("{} request failed: {}", method, e),
                })?;

            response
                .json::<RpcResponse>()
                .await
                .map_err(|e| ClientError::Decode(format!("{} response: {}", method, e)))
        };

        let body = timed_request(self.timeout, send).await?;

        if let Some(err) = body.error {
            return Err(ClientError::Rpc {
                message: format!("{} ({}): {}", method, err.code, err.message),
            });
        }

        body.result.ok_or_else(|| ClientError::Decode(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl EvmClient for JsonRpcEvmClient {
    fn chain_slug(&self) -> &str {
        &self.chain
    }

    async fn native_balance(&self, address: &str) -> Result<Amount> {
        let result = self
            .rpc("eth_getBalance", json!([address, "latest"]))
            .await?;
        decode_quantity(&result)
    }

    async fn erc20_balance(&self, contract: &str, owner: &str) -> Result<Amount> {
        let data = encode_balance_of(owner)?;
        let result = self
            .rpc("eth_call", json!([{"to": contract, "data": data}, "latest"]))
            .await?;
        decode_quantity(&result)
    }

    async fn fee_data(&self) -> Result<EvmFeeData> {
        let gas_price = decode_quantity(&self.rpc("eth_gasPrice", json!([])).await?)?;

        let block = self
            .rpc("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = match block.get("baseFeePerGas") {
            Some(v) if !v.is_null() => Some(decode_quantity(v)?),
            _ => None,
        };

        // Pre-London chains reject eth_maxPriorityFeePerGas
        let priority = if base_fee.is_some() {
            match self.rpc("eth_maxPriorityFeePerGas", json!([])).await {
                Ok(v) => Some(decode_quantity(&v)?),
                Err(e) => {
                    tracing::debug!(chain = %self.chain, "No priority fee endpoint: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(EvmFeeData {
            gas_price: Some(gas_price),
            base_fee_per_gas: base_fee,
            max_priority_fee_per_gas: priority,
        })
    }

    async fn estimate_gas(&self, tx: &EvmTransaction) -> Result<Amount> {
        let mut call = json!({
            "from": tx.from,
            "to": tx.to,
            "value": format!("0x{}", tx.value.as_biguint().to_str_radix(16)),
        });
        if let Some(data) = &tx.data {
            call["data"] = Value::String(data.clone());
        }
        decode_quantity(&self.rpc("eth_estimateGas", json!([call])).await?)
    }
}
