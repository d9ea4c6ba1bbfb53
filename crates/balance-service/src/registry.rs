//! Read-only view over the chain and asset registries

use std::collections::HashMap;
use std::sync::Arc;

use balance_core::{ChainAsset, ChainInfo, TokenSlug};

/// Chains and assets known to a session
#[derive(Debug, Clone, Default)]
pub struct Registry {
    chains: HashMap<String, Arc<ChainInfo>>,
    assets: Vec<ChainAsset>,
}

impl Registry {
    pub fn new(chains: Vec<ChainInfo>, assets: Vec<ChainAsset>) -> Self {
        Self {
            chains: chains
                .into_iter()
                .map(|chain| (chain.slug.clone(), Arc::new(chain)))
                .collect(),
            assets,
        }
    }

    pub fn chain(&self, slug: &str) -> Option<&Arc<ChainInfo>> {
        self.chains.get(slug)
    }

    pub fn asset(&self, slug: &TokenSlug) -> Option<&ChainAsset> {
        self.assets.iter().find(|asset| &asset.slug == slug)
    }

    /// Assets originating on `chain`, restricted to `tokens` unless it is empty
    pub fn assets_for(&self, chain: &str, tokens: &[TokenSlug]) -> Vec<ChainAsset> {
        self.assets
            .iter()
            .filter(|asset| asset.origin_chain == chain)
            .filter(|asset| tokens.is_empty() || tokens.contains(&asset.slug))
            .cloned()
            .collect()
    }

    /// Requested chains that exist and have at least one selected asset
    pub fn select(
        &self,
        chains: &[String],
        tokens: &[TokenSlug],
    ) -> Vec<(Arc<ChainInfo>, Vec<ChainAsset>)> {
        chains
            .iter()
            .filter_map(|slug| {
                let Some(chain) = self.chain(slug) else {
                    tracing::warn!(chain = %slug, "Unknown chain requested, skipping");
                    return None;
                };
                let assets = self.assets_for(slug, tokens);
                if assets.is_empty() {
                    None
                } else {
                    Some((chain.clone(), assets))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_core::{Amount, AssetMetadata, AssetType};

    fn chain(slug: &str) -> ChainInfo {
        ChainInfo {
            slug: slug.into(),
            name: slug.into(),
            substrate: None,
            evm: None,
            bitcoin: None,
            ton: None,
            cardano: None,
        }
    }

    fn asset(slug: &str, chain: &str) -> ChainAsset {
        ChainAsset {
            slug: TokenSlug::new(slug),
            origin_chain: chain.into(),
            asset_type: AssetType::Native,
            symbol: "X".into(),
            decimals: 10,
            min_amount: Amount::zero(),
            metadata: AssetMetadata::default(),
        }
    }

    #[test]
    fn test_select_filters_chains_and_tokens() {
        let registry = Registry::new(
            vec![chain("polkadot"), chain("kusama"), chain("empty")],
            vec![
                asset("polkadot-NATIVE-DOT", "polkadot"),
                asset("kusama-NATIVE-KSM", "kusama"),
                asset("kusama-LOCAL-X", "kusama"),
            ],
        );

        let all = registry.select(
            &["polkadot".into(), "kusama".into(), "empty".into(), "missing".into()],
            &[],
        );
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].1.len(), 2);

        let only = registry.select(
            &["polkadot".into(), "kusama".into()],
            &[TokenSlug::new("kusama-LOCAL-X")],
        );
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].0.slug, "kusama");
        assert!(registry.asset(&TokenSlug::new("kusama-LOCAL-X")).is_some());
    }
}
