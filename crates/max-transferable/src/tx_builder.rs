//! Representative transaction builders
//!
//! Fees are estimated on transactions that are never submitted: the sender is
//! the real account, the recipient is a fixed placeholder and the amount is a
//! small non-zero probe. Builders return `FeeError::TransactionBuild` when a
//! token has no transfer call on its chain.

use balance_core::{Amount, AssetType, ChainAsset, FeeError};
use balance_service::adapters::cardano::asset_unit;
use balance_service::chain_groups;
use chain_client::evm::encode_erc20_transfer;
use chain_client::{CardanoTransfer, EvmTransaction, SubstrateCall, TonTransfer, XcmTransfer};
use serde_json::{json, Value};

use crate::constants::{bitcoin, bridges, placeholder, probe};
use crate::state::{BridgeRoute, TransferRequest};

fn build_error(message: impl Into<String>) -> FeeError {
    FeeError::TransactionBuild {
        message: message.into(),
    }
}

/// Asset ids are numbers on most runtimes; keep non-numeric ids as strings
pub fn asset_id_value(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(id),
    }
}

/// Virtual size of a P2WPKH transaction
pub fn bitcoin_vsize(inputs: u64, outputs: u64) -> u64 {
    bitcoin::TX_OVERHEAD_VBYTES + bitcoin::INPUT_VBYTES * inputs + bitcoin::OUTPUT_VBYTES * outputs
}

/// Amount transferred by the representative transaction
pub fn probe_amount(route: Option<BridgeRoute>, token: &ChainAsset) -> Amount {
    let floor = match route {
        None => return token.min_amount.clone(),
        Some(BridgeRoute::Xcm) => Amount::from(probe::XCM),
        Some(BridgeRoute::PolygonBridge) | Some(BridgeRoute::PosBridge) => {
            Amount::from(probe::POLYGON)
        }
        Some(BridgeRoute::AvailBridge) => Amount::from(probe::AVAIL),
        Some(BridgeRoute::Snowbridge) => Amount::from(probe::SNOWBRIDGE),
    };
    floor.max(token.min_amount.clone())
}

// ============================================================================
// EVM
// ============================================================================

/// Native or ERC-20 transfer of `amount` to the placeholder recipient.
///
/// EVM-side bridge deposits are priced as a transfer of the route's probe amount.
pub fn evm_transfer(request: &TransferRequest, amount: &Amount) -> Result<EvmTransaction, FeeError> {
    let token = &request.token;
    match token.asset_type {
        AssetType::Native => Ok(EvmTransaction {
            from: request.address.clone(),
            to: placeholder::EVM_RECIPIENT.to_string(),
            value: amount.clone(),
            data: None,
        }),
        AssetType::Erc20 => {
            let contract = token
                .metadata
                .contract_address
                .clone()
                .ok_or_else(|| build_error(format!("{} has no contract address", token.slug)))?;
            let data = encode_erc20_transfer(placeholder::EVM_RECIPIENT, amount)
                .map_err(|e| build_error(e.to_string()))?;
            Ok(EvmTransaction {
                from: request.address.clone(),
                to: contract,
                value: Amount::zero(),
                data: Some(data),
            })
        }
        _ => Err(build_error(format!("{} is not transferable on EVM", token.slug))),
    }
}

// ============================================================================
// Substrate
// ============================================================================

/// Placeholder recipient in the account format of the request's chain
fn substrate_recipient(request: &TransferRequest) -> Value {
    let ethereum_accounts = request
        .chain
        .substrate
        .as_ref()
        .is_some_and(|s| s.uses_ethereum_accounts);
    if ethereum_accounts {
        json!(placeholder::EVM_RECIPIENT)
    } else {
        json!({"Id": placeholder::SUBSTRATE_RECIPIENT})
    }
}

fn resolved_id(token: &ChainAsset) -> Result<Value, FeeError> {
    token
        .resolved_asset_id()
        .map(asset_id_value)
        .ok_or_else(|| build_error(format!("{} has no on-chain id", token.slug)))
}

/// Same-chain transfer extrinsic
pub fn substrate_transfer(request: &TransferRequest, amount: &Amount) -> Result<SubstrateCall, FeeError> {
    let token = &request.token;
    let chain = request.chain.slug.as_str();
    let dest = substrate_recipient(request);
    let value = json!(amount.to_string());

    match token.asset_type {
        AssetType::Native if request.transfer_all => Ok(SubstrateCall::new(
            "balances",
            "transferAll",
            vec![dest, json!(request.keep_alive)],
        )),
        AssetType::Native if request.keep_alive => {
            Ok(SubstrateCall::new("balances", "transferKeepAlive", vec![dest, value]))
        }
        AssetType::Native => Ok(SubstrateCall::new(
            "balances",
            "transferAllowDeath",
            vec![dest, value],
        )),
        AssetType::Local => {
            if chain_groups::uses_tokens_pallet(chain) || chain_groups::uses_orml_tokens(chain) {
                let currency = token
                    .metadata
                    .on_chain_info
                    .clone()
                    .ok_or_else(|| build_error(format!("{} has no currency id", token.slug)))?;
                let pallet = if chain_groups::uses_tokens_pallet(chain) {
                    "tokens"
                } else {
                    "currencies"
                };
                Ok(SubstrateCall::new(pallet, "transfer", vec![dest, currency, value]))
            } else if let (true, Some(location)) = (
                chain_groups::supports_foreign_assets(chain),
                &token.metadata.multilocation,
            ) {
                Ok(SubstrateCall::new(
                    "foreignAssets",
                    "transfer",
                    vec![location.clone(), dest, value],
                ))
            } else if chain_groups::uses_assets_pallet(chain) {
                let method = if request.keep_alive { "transferKeepAlive" } else { "transfer" };
                Ok(SubstrateCall::new("assets", method, vec![resolved_id(token)?, dest, value]))
            } else {
                Err(build_error(format!("{} has no transfer call on {}", token.slug, chain)))
            }
        }
        AssetType::Psp22 => {
            let contract = token
                .metadata
                .contract_address
                .clone()
                .ok_or_else(|| build_error(format!("{} has no contract address", token.slug)))?;
            Ok(SubstrateCall::new(
                "contracts",
                "call",
                vec![
                    json!(contract),
                    json!("0"),
                    json!({"method": "PSP22::transfer", "args": [placeholder::SUBSTRATE_RECIPIENT, value, []]}),
                ],
            ))
        }
        AssetType::Grc20 | AssetType::Vft => {
            let program = token
                .metadata
                .contract_address
                .clone()
                .ok_or_else(|| build_error(format!("{} has no program id", token.slug)))?;
            Ok(SubstrateCall::new(
                "gear",
                "sendMessage",
                vec![
                    json!(program),
                    json!({"transfer": {"to": placeholder::SUBSTRATE_RECIPIENT, "value": value}}),
                    json!("0"),
                    json!(request.keep_alive),
                ],
            ))
        }
        _ => Err(build_error(format!("{} is not transferable on {}", token.slug, chain))),
    }
}

/// Location of the transferred token as seen from its chain
fn asset_location(token: &ChainAsset) -> Value {
    match &token.metadata.multilocation {
        Some(location) => location.clone(),
        None if token.is_native() => json!({"parents": 0, "interior": "Here"}),
        None => match token.resolved_asset_id() {
            Some(id) => json!({"parents": 0, "interior": {"X1": [{"GeneralIndex": asset_id_value(id)}]}}),
            None => json!({"parents": 0, "interior": "Here"}),
        },
    }
}

/// Cross-chain extrinsic leaving a Substrate chain over `route`
pub fn bridge_call(
    request: &TransferRequest,
    route: BridgeRoute,
    amount: &Amount,
) -> Result<SubstrateCall, FeeError> {
    let token = &request.token;
    let value = json!(amount.to_string());

    match route {
        BridgeRoute::Xcm => {
            let dest = request
                .dest_chain
                .as_ref()
                .ok_or_else(|| build_error("cross-chain transfer without destination"))?;
            let assets = json!({"V4": [{"id": asset_location(token), "fun": {"Fungible": value}}]});
            let dest_location = json!({"V4": {"chain": dest.slug}});
            let beneficiary = json!({"V4": {"account": placeholder::SUBSTRATE_RECIPIENT}});

            if chain_groups::uses_orml_tokens(&request.chain.slug)
                || chain_groups::uses_tokens_pallet(&request.chain.slug)
            {
                Ok(SubstrateCall::new(
                    "xTokens",
                    "transferMultiassets",
                    vec![assets, json!(0), dest_location, json!("Unlimited")],
                ))
            } else {
                Ok(SubstrateCall::new(
                    "polkadotXcm",
                    "transferAssets",
                    vec![dest_location, beneficiary, assets, json!(0), json!("Unlimited")],
                ))
            }
        }
        BridgeRoute::Snowbridge => {
            let chain_id = bridges::SNOWBRIDGE_ETHEREUM_CHAIN_ID
                .iter()
                .find(|(chain, _)| *chain == request.chain.slug)
                .map(|(_, id)| *id)
                .ok_or_else(|| build_error(format!("no Snowbridge network for {}", request.chain.slug)))?;
            let ethereum = json!({"parents": 2, "interior": {"X1": [{"GlobalConsensus": {"Ethereum": {"chainId": chain_id}}}]}});
            let beneficiary = json!({"V4": {"parents": 0, "interior": {"X1": [{"AccountKey20": {"key": placeholder::EVM_RECIPIENT}}]}}});
            let assets = json!({"V4": [{"id": asset_location(token), "fun": {"Fungible": value}}]});
            Ok(SubstrateCall::new(
                "polkadotXcm",
                "transferAssets",
                vec![json!({"V4": ethereum}), beneficiary, assets, json!(0), json!("Unlimited")],
            ))
        }
        BridgeRoute::AvailBridge => Ok(SubstrateCall::new(
            "vector",
            "sendMessage",
            vec![
                json!({"FungibleToken": {"assetId": placeholder::H256_RECIPIENT, "amount": value}}),
                json!(placeholder::H256_RECIPIENT),
                json!(2),
            ],
        )),
        BridgeRoute::PolygonBridge | BridgeRoute::PosBridge => Err(build_error(format!(
            "{:?} does not start on a Substrate chain",
            route
        ))),
    }
}

/// Dry-run description of a multi-hop XCM transfer
pub fn xcm_transfer(request: &TransferRequest, amount: &Amount) -> Result<XcmTransfer, FeeError> {
    let dest = request
        .dest_chain
        .as_ref()
        .ok_or_else(|| build_error("cross-chain transfer without destination"))?;
    Ok(XcmTransfer {
        origin_chain: request.chain.slug.clone(),
        dest_chain: dest.slug.clone(),
        asset_location: asset_location(&request.token),
        amount: amount.clone(),
        sender: request.address.clone(),
        recipient: placeholder::SUBSTRATE_RECIPIENT.to_string(),
    })
}

// ============================================================================
// TON / Cardano
// ============================================================================

pub fn ton_transfer(request: &TransferRequest, amount: &Amount) -> Result<TonTransfer, FeeError> {
    let token = &request.token;
    let jetton_master = match token.asset_type {
        AssetType::Native => None,
        AssetType::TonJetton => Some(
            token
                .metadata
                .contract_address
                .clone()
                .ok_or_else(|| build_error(format!("{} has no jetton master", token.slug)))?,
        ),
        _ => return Err(build_error(format!("{} is not transferable on TON", token.slug))),
    };
    Ok(TonTransfer {
        from: request.address.clone(),
        to: placeholder::TON_RECIPIENT.to_string(),
        amount: amount.clone(),
        jetton_master,
    })
}

/// Self-transfer, so no recipient address format is assumed
pub fn cardano_transfer(request: &TransferRequest, amount: &Amount) -> Result<CardanoTransfer, FeeError> {
    let unit = asset_unit(&request.token)
        .ok_or_else(|| build_error(format!("{} has no Cardano unit", request.token.slug)))?;
    Ok(CardanoTransfer {
        from: request.address.clone(),
        to: request.address.clone(),
        unit: unit.to_string(),
        amount: amount.clone(),
    })
}
