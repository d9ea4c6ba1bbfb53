//! Foreign / bridged asset balances (`foreignAssets.account`)
//!
//! Foreign assets are keyed by XCM location. Registry locations are stored in
//! V4 form; chains still on V3 keys need single-junction interiors collapsed.

use std::sync::Arc;

use balance_core::{applied_existential_deposit, AdapterError, ChainAsset};
use chain_client::{ChainCapabilities, StorageEntry, StorageQuery, SubstrateClient, XcmVersion};
use serde_json::Value;

use super::asset_id_arg;
use super::assets::{watch, AssetKey};
use crate::adapters::AdapterContext;
use crate::chain_groups;
use crate::handle::SubscriptionHandle;

/// Re-encode a V4 location for the chain's key version.
///
/// V4 `X1` holds a one-element junction array; V3 holds the junction itself.
pub fn encode_location(location: &Value, version: XcmVersion) -> Value {
    if version == XcmVersion::V4 {
        return location.clone();
    }

    let mut encoded = location.clone();
    if let Some(interior) = encoded.get_mut("interior").and_then(Value::as_object_mut) {
        for key in ["X1", "x1"] {
            let collapsed = match interior.get(key) {
                Some(Value::Array(junctions)) if junctions.len() == 1 => Some(junctions[0].clone()),
                _ => None,
            };
            if let Some(junction) = collapsed {
                interior.insert(key.to_string(), junction);
            }
        }
    }
    encoded
}

/// Storage key identity of a foreign asset: its location, else a direct asset id
fn asset_key_arg(asset: &ChainAsset, version: XcmVersion) -> Option<Value> {
    if let Some(location) = &asset.metadata.multilocation {
        return Some(encode_location(location, version));
    }
    asset.resolved_asset_id().map(asset_id_arg)
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
    caps: &ChainCapabilities,
) -> Result<SubscriptionHandle, AdapterError> {
    let version = caps
        .xcm_version
        .unwrap_or_else(|| chain_groups::fallback_xcm_version(ctx.chain_slug()));

    let mut keys = Vec::new();
    for asset in &ctx.assets {
        let Some(key_arg) = asset_key_arg(asset, version) else {
            tracing::warn!(
                chain = %ctx.chain_slug(),
                slug = %asset.slug,
                "Foreign asset has neither location nor id, not subscribing"
            );
            continue;
        };
        let applied_ed = applied_existential_deposit(&asset.min_amount, ctx.tx_hint);

        for address in &ctx.addresses {
            keys.push(AssetKey {
                address: address.clone(),
                asset: asset.clone(),
                applied_ed: applied_ed.clone(),
                query: StorageQuery::new(
                    StorageEntry::ForeignAssetsAccount,
                    vec![key_arg.clone(), Value::from(address.as_str())],
                ),
            });
        }
    }

    if keys.is_empty() {
        return Err(AdapterError::UnresolvedAsset {
            slug: ctx
                .assets
                .iter()
                .map(|a| a.slug.to_string())
                .collect::<Vec<_>>()
                .join(","),
        });
    }

    tracing::debug!(
        chain = %ctx.chain_slug(),
        version = version.as_str(),
        keys = keys.len(),
        "Watching foreign assets"
    );

    Ok(watch(ctx, client, "foreign-assets", keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::substrate::mock::MockSubstrate;
    use crate::adapters::testing::{asset, chain, context, next_batch};
    use balance_core::{Amount, AssetType};
    use serde_json::json;

    fn ksm_location() -> Value {
        json!({"parents": 2, "interior": {"X1": [{"GlobalConsensus": "Kusama"}]}})
    }

    #[test]
    fn test_encode_location() {
        let v4 = ksm_location();
        assert_eq!(encode_location(&v4, XcmVersion::V4), v4);
        assert_eq!(
            encode_location(&v4, XcmVersion::V3),
            json!({"parents": 2, "interior": {"X1": {"GlobalConsensus": "Kusama"}}})
        );

        let x2 = json!({"parents": 1, "interior": {"X2": [{"Parachain": 1000}, {"PalletInstance": 50}]}});
        assert_eq!(encode_location(&x2, XcmVersion::V3), x2);
    }

    #[tokio::test]
    async fn test_foreign_asset_by_location() {
        let mut ksm = asset("statemint-LOCAL-KSM", "statemint", AssetType::Local, 0);
        ksm.metadata.multilocation = Some(ksm_location());

        let (ctx, session, mut rx) = context(chain("statemint"), &["A"], vec![ksm]);
        let client = MockSubstrate::new("statemint")
            .with_member("polkadotXcm", "transferAssetsUsingTypeAndThen");
        client.set_storage(
            StorageEntry::ForeignAssetsAccount,
            vec![ksm_location(), json!("A")],
            json!({"balance": "42", "status": "Liquid"}),
        );
        let caps = chain_client::detect_capabilities(&client);

        let handle = subscribe(&ctx, Arc::new(client), &caps).unwrap();
        session.attach(handle);

        assert_eq!(next_batch(&mut rx).await[0].free, Amount::from(42u64));
        session.cancel();
    }

    #[tokio::test]
    async fn test_v3_chain_uses_collapsed_key() {
        let mut ksm = asset("mythos-LOCAL-KSM", "mythos", AssetType::Local, 0);
        ksm.metadata.multilocation = Some(ksm_location());

        let (ctx, session, mut rx) = context(chain("mythos"), &["A"], vec![ksm]);
        let client = MockSubstrate::new("mythos");
        client.set_storage(
            StorageEntry::ForeignAssetsAccount,
            vec![encode_location(&ksm_location(), XcmVersion::V3), json!("A")],
            json!({"balance": "8"}),
        );

        let handle = subscribe(&ctx, Arc::new(client), &ChainCapabilities::default()).unwrap();
        session.attach(handle);

        assert_eq!(next_batch(&mut rx).await[0].free, Amount::from(8u64));
        session.cancel();
    }
}
