//! Fee-token converters
//!
//! Translate a fee quoted in the native token into the local token that will
//! actually pay it. Both conversions round up so the converted fee never
//! under-reserves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use balance_core::{Amount, ChainAsset, FeeError};
use chain_client::{
    timed_request, RuntimeApi, RuntimeApiCall, StorageEntry, StorageQuery, SubstrateClient,
};
use num_bigint::BigUint;
use num_traits::Zero;
use serde_json::{json, Value};

use crate::constants::fee_groups;
use crate::tx_builder::asset_id_value;

/// Convert a native-token fee into `token` terms
#[async_trait]
pub trait FeeTokenConverter: Send + Sync {
    async fn convert(&self, native_fee: &Amount, token: &ChainAsset) -> Result<Amount, FeeError>;
}

/// Required input for a desired output of a constant-product pool
///
/// Formula: input = (reserve_in * output * fee_denom) / ((reserve_out - output) * fee_num) + 1
pub fn amount_in(
    reserve_in: &Amount,
    reserve_out: &Amount,
    amount_out: &Amount,
    fee_num: u64,
    fee_denom: u64,
) -> Option<Amount> {
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out.is_zero() {
        return None;
    }
    if amount_out >= reserve_out {
        return None; // Can't take more than reserves
    }

    let numerator =
        reserve_in.as_biguint() * amount_out.as_biguint() * BigUint::from(fee_denom);
    let denominator =
        (reserve_out.as_biguint() - amount_out.as_biguint()) * BigUint::from(fee_num);

    if denominator.is_zero() {
        return None;
    }

    // Round up
    Some(Amount::from(numerator / denominator + 1u32))
}

/// Location of the relay-chain native token as seen from an asset hub
fn native_location() -> Value {
    json!({"parents": 1, "interior": "Here"})
}

/// Location of a local token on an asset hub
fn token_location(token: &ChainAsset) -> Option<Value> {
    if let Some(location) = &token.metadata.multilocation {
        return Some(location.clone());
    }
    token.resolved_asset_id().map(|id| {
        json!({
            "parents": 0,
            "interior": {"X2": [
                {"PalletInstance": fee_groups::ASSETS_PALLET_INSTANCE},
                {"GeneralIndex": asset_id_value(id)}
            ]}
        })
    })
}

fn conversion_error(token: &ChainAsset, reason: impl Into<String>) -> FeeError {
    FeeError::Conversion {
        token: token.slug.to_string(),
        reason: reason.into(),
    }
}

/// Converts through the asset-conversion pool between the native token and `token`
pub struct ReservePoolConverter {
    client: Arc<dyn SubstrateClient>,
    timeout: Duration,
}

impl ReservePoolConverter {
    pub fn new(client: Arc<dyn SubstrateClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// `(native reserve, token reserve)` of the pool
    async fn reserves(&self, token: &ChainAsset) -> Result<(Amount, Amount), FeeError> {
        let location = token_location(token)
            .ok_or_else(|| conversion_error(token, "token has no location"))?;
        let call = RuntimeApiCall::new(
            RuntimeApi::AssetConversionReserves,
            vec![native_location(), location],
        );
        let value = timed_request(self.timeout, self.client.call_runtime_api(call)).await?;

        match value.as_array().map(Vec::as_slice) {
            Some([native, local]) => match (Amount::from_json(native), Amount::from_json(local)) {
                (Some(native), Some(local)) => Ok((native, local)),
                _ => Err(conversion_error(token, "malformed pool reserves")),
            },
            _ => Err(conversion_error(token, "no pool with the native token")),
        }
    }
}

#[async_trait]
impl FeeTokenConverter for ReservePoolConverter {
    async fn convert(&self, native_fee: &Amount, token: &ChainAsset) -> Result<Amount, FeeError> {
        if native_fee.is_zero() {
            return Ok(Amount::zero());
        }
        let (native_reserve, token_reserve) = self.reserves(token).await?;
        amount_in(
            &token_reserve,
            &native_reserve,
            native_fee,
            fee_groups::POOL_FEE_NUM,
            fee_groups::POOL_FEE_DENOM,
        )
        .ok_or_else(|| conversion_error(token, "pool liquidity too low"))
    }
}

/// Converts through the accepted-currency price (FixedU128) of `token`
pub struct ExchangeRateConverter {
    client: Arc<dyn SubstrateClient>,
    timeout: Duration,
}

impl ExchangeRateConverter {
    pub fn new(client: Arc<dyn SubstrateClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl FeeTokenConverter for ExchangeRateConverter {
    async fn convert(&self, native_fee: &Amount, token: &ChainAsset) -> Result<Amount, FeeError> {
        let id = token
            .resolved_asset_id()
            .ok_or_else(|| conversion_error(token, "token has no asset id"))?;

        let query = StorageQuery::new(
            StorageEntry::MultiTransactionPaymentAcceptedCurrencies,
            vec![asset_id_value(id)],
        );
        let results =
            timed_request(self.timeout, self.client.query_storage(vec![query.clone()])).await?;

        let price = match results.get(&query) {
            Value::Null => None,
            value => Amount::from_json(value),
        }
        .filter(|price| !price.is_zero())
        .ok_or_else(|| conversion_error(token, "not an accepted fee currency"))?;

        Ok(native_fee.mul_div_ceil(&price, &Amount::from(fee_groups::FIXED_U128_SCALE)))
    }
}
