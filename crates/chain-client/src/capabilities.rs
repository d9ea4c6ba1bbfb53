//! Chain capability detection
//!
//! Detects which optional pallet features a Substrate runtime exposes. The result
//! is resolved once when an adapter starts and then passed around as a plain
//! descriptor instead of re-probing the runtime on every call.

use serde::{Deserialize, Serialize};

use crate::SubstrateClient;

/// Where nomination-pool stake lives for pool members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NominationPoolsMode {
    /// No nomination pools pallet
    Absent,
    /// Stake is held on the member account (delegated staking); nothing extra to read
    Migrated,
    /// Stake sits in the pool's bonded account; read `poolMembers` to attribute it
    Legacy,
}

/// XCM encoding version used for multilocation storage keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XcmVersion {
    V3,
    V4,
}

impl XcmVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V3 => "V3",
            Self::V4 => "V4",
        }
    }
}

/// Runtime features relevant to balance reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainCapabilities {
    pub nomination_pools: NominationPoolsMode,

    /// `balances.holds` storage exists
    pub has_holds: bool,

    /// `balances.freezes` storage exists
    pub has_freezes: bool,

    /// Encoding version for multilocation keys, if the chain has XCM
    pub xcm_version: Option<XcmVersion>,
}

impl Default for ChainCapabilities {
    fn default() -> Self {
        Self {
            nomination_pools: NominationPoolsMode::Absent,
            has_holds: false,
            has_freezes: false,
            xcm_version: None,
        }
    }
}

impl ChainCapabilities {
    /// Whether legacy pool-member stake has to be attributed separately
    pub fn needs_pool_member_query(&self) -> bool {
        self.nomination_pools == NominationPoolsMode::Legacy
    }
}

/// Detect chain capabilities by probing runtime metadata
pub fn detect_capabilities(client: &dyn SubstrateClient) -> ChainCapabilities {
    let nomination_pools = if !client.has_pallet_member("nominationPools", "poolMembers") {
        NominationPoolsMode::Absent
    } else if client.has_pallet_member("nominationPools", "migrateDelegation") {
        NominationPoolsMode::Migrated
    } else {
        NominationPoolsMode::Legacy
    };

    let xcm_version = if client.has_pallet_member("polkadotXcm", "transferAssetsUsingTypeAndThen")
        || client.has_pallet_member("xcmPallet", "transferAssetsUsingTypeAndThen")
    {
        Some(XcmVersion::V4)
    } else if client.has_pallet_member("polkadotXcm", "limitedReserveTransferAssets")
        || client.has_pallet_member("xTokens", "transferMultiasset")
    {
        Some(XcmVersion::V3)
    } else {
        None
    };

    let caps = ChainCapabilities {
        nomination_pools,
        has_holds: client.has_pallet_member("balances", "holds"),
        has_freezes: client.has_pallet_member("balances", "freezes"),
        xcm_version,
    };

    tracing::debug!(
        chain = client.chain_slug(),
        nomination_pools = ?caps.nomination_pools,
        has_holds = caps.has_holds,
        has_freezes = caps.has_freezes,
        "Detected chain capabilities"
    );

    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_member_query() {
        let caps = ChainCapabilities {
            nomination_pools: NominationPoolsMode::Legacy,
            ..Default::default()
        };
        assert!(caps.needs_pool_member_query());

        let migrated = ChainCapabilities {
            nomination_pools: NominationPoolsMode::Migrated,
            ..caps
        };
        assert!(!migrated.needs_pool_member_query());
    }

    #[test]
    fn test_xcm_version_display() {
        assert_eq!(XcmVersion::V3.as_str(), "V3");
        assert_eq!(XcmVersion::V4.as_str(), "V4");
    }
}
