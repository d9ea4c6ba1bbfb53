//! Max-transferable calculator
//!
//! Estimates the fee of a representative transfer and subtracts whatever part
//! of it is paid from the transferred token. Estimation and construction
//! failures never escape: they produce a zero-fee quote with `error` set.

use std::sync::Arc;
use std::time::Duration;

use balance_core::{Amount, AssetType, BalanceConfig, ChainFamily, ClientError, FeeError};
use chain_client::{timed_request, ClientMaps, SubstrateClient};

use crate::constants::fee_groups;
use crate::converters::{ExchangeRateConverter, FeeTokenConverter, ReservePoolConverter};
use crate::state::{
    BitcoinFeeOptions, BridgeRoute, EvmFeeOptions, FeeChainType, FeeQuote, MaxTransferableResult,
    SimpleFeeOptions, SubstrateFeeOptions, TransferRequest,
};
use crate::tx_builder;

/// Computes the largest safe transfer amount for a free balance
pub struct MaxTransferableCalculator {
    clients: ClientMaps,
    xcm_fee_ratio_ppm: u64,
    timeout: Duration,
}

impl MaxTransferableCalculator {
    pub fn new(clients: ClientMaps, config: &BalanceConfig) -> Self {
        Self {
            clients,
            xcm_fee_ratio_ppm: config.xcm_fee_ratio_ppm,
            timeout: config.request_timeout(),
        }
    }

    /// Largest amount of `request.token` that can be sent from `free_balance`.
    ///
    /// `fee_quote` carries the caller's fee preferences (gas price, tip, fee
    /// rate); the estimate is fetched from the chain where it is absent. Only a
    /// cross-chain request without a destination token is an error.
    pub async fn calculate(
        &self,
        id: &str,
        request: &TransferRequest,
        free_balance: &Amount,
        fee_quote: Option<&FeeQuote>,
    ) -> Result<MaxTransferableResult, FeeError> {
        if request.is_cross_chain() && request.dest_token.is_none() {
            return Err(FeeError::MissingDestinationToken);
        }

        let fee_type = self.fee_type(request);
        let mut error = None;

        let quote = match self.estimate(request, fee_quote).await {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(
                    id,
                    chain = %request.chain.slug,
                    token = %request.token.slug,
                    "Fee estimation failed: {}",
                    e
                );
                error = Some(e.to_string());
                FeeQuote::zero(fee_type, fee_quote)
            }
        };

        let mut fee = quote.estimated_fee().clone();
        if request.is_cross_chain() {
            fee = fee.mul_ppm(self.xcm_fee_ratio_ppm);
        }

        let deduction = if request.token.is_native() {
            Some(fee)
        } else if request.pays_fee_in_token() {
            match self.fee_in_token(request, &fee).await {
                Ok(converted) => Some(converted),
                Err(e) => {
                    tracing::warn!(id, token = %request.token.slug, "Fee conversion failed: {}", e);
                    error.get_or_insert(e.to_string());
                    // Unknown token fee: nothing is safe to send
                    None
                }
            }
        } else {
            Some(Amount::zero())
        };

        let max_transferable = match deduction {
            Some(deduction) => free_balance.saturating_sub(&deduction),
            None => Amount::zero(),
        };

        tracing::debug!(
            id,
            free = %free_balance,
            fee = %quote.estimated_fee(),
            max = %max_transferable,
            "Max transferable computed"
        );

        Ok(MaxTransferableResult {
            max_transferable,
            fee_options: quote,
            fee_type,
            id: id.to_string(),
            error,
        })
    }

    /// ERC-20 tokens on hybrid Substrate+EVM chains are priced on the EVM side
    fn fee_type(&self, request: &TransferRequest) -> FeeChainType {
        if self.is_evm_side(request) {
            FeeChainType::Evm
        } else {
            request.chain.family().into()
        }
    }

    fn is_evm_side(&self, request: &TransferRequest) -> bool {
        match request.chain.family() {
            ChainFamily::Evm => true,
            ChainFamily::Substrate => {
                request.chain.evm.is_some() && request.token.asset_type == AssetType::Erc20
            }
            _ => false,
        }
    }

    async fn estimate(
        &self,
        request: &TransferRequest,
        preference: Option<&FeeQuote>,
    ) -> Result<FeeQuote, FeeError> {
        let route = request.route();
        let amount = tx_builder::probe_amount(route, &request.token);

        if self.is_evm_side(request) {
            return self.estimate_evm(request, &amount, preference).await;
        }
        match request.chain.family() {
            ChainFamily::Substrate => {
                self.estimate_substrate(request, route, &amount, preference)
                    .await
            }
            ChainFamily::Bitcoin => self.estimate_bitcoin(request, preference).await,
            ChainFamily::Ton => self.estimate_ton(request, &amount).await,
            ChainFamily::Cardano => self.estimate_cardano(request, &amount).await,
            ChainFamily::Evm => self.estimate_evm(request, &amount, preference).await,
        }
    }

    // ========================================================================
    // Per-family estimation
    // ========================================================================

    async fn estimate_evm(
        &self,
        request: &TransferRequest,
        amount: &Amount,
        preference: Option<&FeeQuote>,
    ) -> Result<FeeQuote, FeeError> {
        let slug = request.chain.slug.as_str();
        let client = self
            .clients
            .evm
            .get(slug)
            .ok_or_else(|| missing_client(slug, ChainFamily::Evm))?;

        let tx = tx_builder::evm_transfer(request, amount)?;
        let gas_limit = timed_request(self.timeout, client.estimate_gas(&tx)).await?;

        let preferred = match preference {
            Some(FeeQuote::Evm(options)) if options.price().is_some() => Some(options.clone()),
            _ => None,
        };
        let mut options = match preferred {
            Some(options) => options,
            None => {
                let data = timed_request(self.timeout, client.fee_data()).await?;
                match data.base_fee_per_gas {
                    Some(_) => EvmFeeOptions {
                        max_fee_per_gas: data.effective_gas_price(),
                        max_priority_fee_per_gas: data.max_priority_fee_per_gas.clone(),
                        ..Default::default()
                    },
                    None => EvmFeeOptions {
                        gas_price: data.gas_price.clone(),
                        ..Default::default()
                    },
                }
            }
        };

        let price = options
            .price()
            .cloned()
            .ok_or_else(|| FeeError::EstimationFailed {
                message: format!("no gas price available on {}", slug),
            })?;

        options.estimated_fee = Amount::from(gas_limit.as_biguint() * price.as_biguint());
        options.gas_limit = gas_limit;
        Ok(FeeQuote::Evm(options))
    }

    async fn estimate_substrate(
        &self,
        request: &TransferRequest,
        route: Option<BridgeRoute>,
        amount: &Amount,
        preference: Option<&FeeQuote>,
    ) -> Result<FeeQuote, FeeError> {
        let client = self.substrate_client(request)?;
        if !client.is_ready() {
            return Err(ClientError::NotReady {
                chain: request.chain.slug.clone(),
            }
            .into());
        }

        let fee = match route {
            None => {
                let call = tx_builder::substrate_transfer(request, amount)?;
                timed_request(self.timeout, client.payment_info(&call, &request.address)).await?
            }
            Some(BridgeRoute::Xcm) if request.is_multi_hop() => {
                let transfer = tx_builder::xcm_transfer(request, amount)?;
                timed_request(self.timeout, client.estimate_xcm_fee(&transfer)).await?
            }
            Some(route) => {
                let call = tx_builder::bridge_call(request, route, amount)?;
                timed_request(self.timeout, client.payment_info(&call, &request.address)).await?
            }
        };

        let tip = match preference {
            Some(FeeQuote::Substrate(options)) => options.tip.clone(),
            _ => Amount::zero(),
        };

        Ok(FeeQuote::Substrate(SubstrateFeeOptions {
            estimated_fee: fee + tip.clone(),
            tip,
        }))
    }

    async fn estimate_bitcoin(
        &self,
        request: &TransferRequest,
        preference: Option<&FeeQuote>,
    ) -> Result<FeeQuote, FeeError> {
        let slug = request.chain.slug.as_str();
        let client = self
            .clients
            .bitcoin
            .get(slug)
            .ok_or_else(|| missing_client(slug, ChainFamily::Bitcoin))?;

        let fee_rate = match preference {
            Some(FeeQuote::Bitcoin(options)) if options.fee_rate > 0 => options.fee_rate,
            _ => timed_request(self.timeout, client.fee_rates()).await?.average,
        };

        // Sweeping every spendable output into a single recipient output
        let utxos = timed_request(self.timeout, client.spendable_utxos(&request.address)).await?;
        let inputs = (utxos.len() as u64).max(1);
        let vsize = tx_builder::bitcoin_vsize(inputs, 1);

        Ok(FeeQuote::Bitcoin(BitcoinFeeOptions {
            fee_rate,
            vsize,
            estimated_fee: Amount::from(vsize.saturating_mul(fee_rate)),
        }))
    }

    async fn estimate_ton(&self, request: &TransferRequest, amount: &Amount) -> Result<FeeQuote, FeeError> {
        let slug = request.chain.slug.as_str();
        let client = self
            .clients
            .ton
            .get(slug)
            .ok_or_else(|| missing_client(slug, ChainFamily::Ton))?;

        let transfer = tx_builder::ton_transfer(request, amount)?;
        let estimated_fee = timed_request(self.timeout, client.estimate_fee(&transfer)).await?;
        Ok(FeeQuote::Ton(SimpleFeeOptions { estimated_fee }))
    }

    async fn estimate_cardano(&self, request: &TransferRequest, amount: &Amount) -> Result<FeeQuote, FeeError> {
        let slug = request.chain.slug.as_str();
        let client = self
            .clients
            .cardano
            .get(slug)
            .ok_or_else(|| missing_client(slug, ChainFamily::Cardano))?;

        let transfer = tx_builder::cardano_transfer(request, amount)?;
        let estimated_fee = timed_request(self.timeout, client.estimate_fee(&transfer)).await?;
        Ok(FeeQuote::Cardano(SimpleFeeOptions { estimated_fee }))
    }

    // ========================================================================
    // Fee-token conversion
    // ========================================================================

    /// Fee in `request.token` terms; zero on chains outside the fee-token
    /// conversion groups
    async fn fee_in_token(
        &self,
        request: &TransferRequest,
        native_fee: &Amount,
    ) -> Result<Amount, FeeError> {
        let slug = request.chain.slug.as_str();
        let converter: Box<dyn FeeTokenConverter> =
            if fee_groups::RESERVE_POOL_CHAINS.contains(&slug) {
                Box::new(ReservePoolConverter::new(self.substrate_client(request)?, self.timeout))
            } else if fee_groups::EXCHANGE_RATE_CHAINS.contains(&slug) {
                Box::new(ExchangeRateConverter::new(self.substrate_client(request)?, self.timeout))
            } else {
                return Ok(Amount::zero());
            };

        converter.convert(native_fee, &request.token).await
    }

    fn substrate_client(&self, request: &TransferRequest) -> Result<Arc<dyn SubstrateClient>, FeeError> {
        let slug = request.chain.slug.as_str();
        self.clients
            .substrate
            .get(slug)
            .cloned()
            .ok_or_else(|| missing_client(slug, ChainFamily::Substrate))
    }
}

fn missing_client(chain: &str, family: ChainFamily) -> FeeError {
    FeeError::MissingClient {
        chain: chain.to_string(),
        family: family.to_string(),
    }
}

/// One-shot form of [`MaxTransferableCalculator::calculate`]
pub async fn calculate_max_transferable(
    id: &str,
    request: &TransferRequest,
    free_balance: &Amount,
    fee_quote: Option<&FeeQuote>,
    clients: ClientMaps,
    config: &BalanceConfig,
) -> Result<MaxTransferableResult, FeeError> {
    MaxTransferableCalculator::new(clients, config)
        .calculate(id, request, free_balance, fee_quote)
        .await
}



#[cfg(test)]
mod tests {
    use super::mock::{MockBitcoin, MockEvm, MockSubstrate};
    use super::testing::*;
    use super::*;
    use serde_json::json;

    fn config() -> BalanceConfig {
        BalanceConfig {
            request_timeout_ms: 500,
            ..Default::default()
        }
    }

    fn cross_chain(mut req: TransferRequest, dest: &str) -> TransferRequest {
        req.dest_token = Some(native(dest, 0));
        req.dest_chain = Some(substrate_chain(dest));
        req
    }

    #[tokio::test]
    async fn test_cross_chain_native_subtracts_xcm_fee() {
        let mut client = MockSubstrate::new("hydradx_main");
        client.xcm_fee = Ok(Amount::from(5u64));
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(Arc::new(client)),
            &config(),
        );

        let mut req = cross_chain(request(substrate_chain("hydradx_main"), native("hydradx_main", 0)), "moonbeam");
        req.reserve_chain = Some("polkadot".into());

        let result = calculator
            .calculate("xcm-1", &req, &Amount::from(1000u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(995u64));
        assert_eq!(result.fee_type, FeeChainType::Substrate);
        assert_eq!(result.id, "xcm-1");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_direct_xcm_uses_payment_info_and_ratio() {
        let mut client = MockSubstrate::new("polkadot");
        client.partial_fee = Ok(Amount::from(10u64));
        let client = Arc::new(client);
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(client.clone()),
            &BalanceConfig {
                xcm_fee_ratio_ppm: 1_500_000,
                ..config()
            },
        );

        let req = cross_chain(request(substrate_chain("polkadot"), native("polkadot", 0)), "statemint");
        let result = calculator
            .calculate("xcm-2", &req, &Amount::from(1000u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(985u64));
        assert_eq!(client.last_call().unwrap().method, "transferAssets");
    }

    #[tokio::test]
    async fn test_missing_destination_token_is_an_error() {
        let calculator = MaxTransferableCalculator::new(ClientMaps::new(), &config());
        let mut req = request(substrate_chain("polkadot"), native("polkadot", 0));
        req.dest_chain = Some(substrate_chain("statemint"));

        let err = calculator
            .calculate("x", &req, &Amount::from(1u64), None)
            .await
            .unwrap_err();
        assert!(err.is_programmer_error());
    }

    #[tokio::test]
    async fn test_evm_fee_subtracted_from_native() {
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_evm(Arc::new(MockEvm::new("ethereum"))),
            &config(),
        );
        let req = request(evm_chain("ethereum"), native("ethereum", 0));

        let result = calculator
            .calculate("evm", &req, &Amount::from(1_000_000u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(790_000u64));
        let FeeQuote::Evm(options) = &result.fee_options else {
            panic!("expected evm fee options");
        };
        assert_eq!(options.gas_limit, Amount::from(21_000u64));
        assert_eq!(options.estimated_fee, Amount::from(210_000u64));

        // Fee larger than the balance clamps at zero
        let result = calculator
            .calculate("evm", &req, &Amount::from(1_000u64), None)
            .await
            .unwrap();
        assert!(result.max_transferable.is_zero());
    }

    #[tokio::test]
    async fn test_evm_estimation_failure_is_non_fatal() {
        let mut client = MockEvm::new("ethereum");
        client.gas = Err(ClientError::Rpc {
            message: "execution reverted".into(),
        });
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_evm(Arc::new(client)),
            &config(),
        );

        let native_req = request(evm_chain("ethereum"), native("ethereum", 0));
        let result = calculator
            .calculate("evm", &native_req, &Amount::from(500u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(500u64));
        assert!(result.error.as_deref().unwrap().contains("execution reverted"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["feeOptions"]["estimatedFee"], "0");
        assert_eq!(json["feeOptions"]["gasLimit"], "0");
        assert_eq!(json["feeType"], "evm");

        let mut usdc = local("ethereum", AssetType::Erc20);
        usdc.metadata.contract_address = Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into());
        let token_req = request(evm_chain("ethereum"), usdc);
        let result = calculator
            .calculate("evm", &token_req, &Amount::from(500u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(500u64));
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_preferred_gas_price_is_used() {
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_evm(Arc::new(MockEvm::new("ethereum"))),
            &config(),
        );
        let req = request(evm_chain("ethereum"), native("ethereum", 0));
        let preference = FeeQuote::Evm(EvmFeeOptions {
            max_fee_per_gas: Some(Amount::from(2u64)),
            ..Default::default()
        });

        let result = calculator
            .calculate("evm", &req, &Amount::from(100_000u64), Some(&preference))
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(58_000u64));
    }

    #[tokio::test]
    async fn test_other_token_pays_fee() {
        let mut client = MockSubstrate::new("acala");
        client.partial_fee = Ok(Amount::from(50u64));
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(Arc::new(client)),
            &config(),
        );

        let mut ausd = local("acala", AssetType::Local);
        ausd.metadata.on_chain_info = Some(json!({"Token": "AUSD"}));
        let result = calculator
            .calculate("tok", &request(substrate_chain("acala"), ausd), &Amount::from(300u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(300u64));
        assert_eq!(result.fee_options.estimated_fee(), &Amount::from(50u64));
    }

    #[tokio::test]
    async fn test_reserve_pool_fee_paid_in_token() {
        let mut client = MockSubstrate::new("statemint");
        client.partial_fee = Ok(Amount::from(10u64));
        client.set_runtime_api(
            chain_client::RuntimeApi::AssetConversionReserves,
            json!(["1000", "1000"]),
        );
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(Arc::new(client)),
            &config(),
        );

        let mut usdt = local("statemint", AssetType::Local);
        usdt.metadata.asset_id = Some("1984".into());
        let mut req = request(substrate_chain("statemint"), usdt.clone());
        req.fee_token = Some(usdt.slug.clone());

        let result = calculator
            .calculate("pool", &req, &Amount::from(100u64), None)
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(89u64));
    }

    #[tokio::test]
    async fn test_failed_conversion_is_conservative() {
        let mut client = MockSubstrate::new("hydradx_main");
        client.partial_fee = Ok(Amount::from(10u64));
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(Arc::new(client)),
            &config(),
        );

        let mut dai = local("hydradx_main", AssetType::Local);
        dai.metadata.asset_id = Some("2".into());
        dai.metadata.on_chain_info = Some(json!(2));
        let mut req = request(substrate_chain("hydradx_main"), dai.clone());
        req.fee_token = Some(dai.slug.clone());

        let result = calculator
            .calculate("rate", &req, &Amount::from(100u64), None)
            .await
            .unwrap();
        assert!(result.max_transferable.is_zero());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_substrate_tip_and_not_ready() {
        let mut client = MockSubstrate::new("polkadot");
        client.partial_fee = Ok(Amount::from(20u64));
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(Arc::new(client)),
            &config(),
        );
        let req = request(substrate_chain("polkadot"), native("polkadot", 0));
        let tip = FeeQuote::Substrate(SubstrateFeeOptions {
            tip: Amount::from(5u64),
            estimated_fee: Amount::zero(),
        });

        let result = calculator
            .calculate("tip", &req, &Amount::from(100u64), Some(&tip))
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(75u64));

        let mut offline = MockSubstrate::new("polkadot");
        offline.ready = false;
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_substrate(Arc::new(offline)),
            &config(),
        );
        let result = calculator
            .calculate("tip", &req, &Amount::from(100u64), Some(&tip))
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(100u64));
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_bitcoin_sweep_fee() {
        let calculator = MaxTransferableCalculator::new(
            ClientMaps::new().with_bitcoin(Arc::new(MockBitcoin { utxos: 2 })),
            &config(),
        );
        let req = request(bitcoin_chain("bitcoin"), native("bitcoin", 0));

        let result = calculator
            .calculate("btc", &req, &Amount::from(10_000u64), None)
            .await
            .unwrap();
        // (11 + 2 * 68 + 31) vB at 10 sat/vB
        assert_eq!(result.max_transferable, Amount::from(8_220u64));
        assert_eq!(result.fee_type, FeeChainType::Bitcoin);
    }

    #[tokio::test]
    async fn test_missing_client_reports_error() {
        let req = request(evm_chain("base"), native("base", 0));

        let result = calculate_max_transferable("m", &req, &Amount::from(42u64), None, ClientMaps::new(), &config())
            .await
            .unwrap();
        assert_eq!(result.max_transferable, Amount::from(42u64));
        assert!(result.error.unwrap().contains("No evm client"));
    }
}
