//! Static per-chain group tables
//!
//! Which balance pallets a Substrate chain exposes is decided by membership in
//! these tables, not by inspecting the runtime.

use chain_client::XcmVersion;

/// Chains whose local tokens live in `tokens.accounts`
pub const TOKENS_PALLET_CHAINS: &[&str] = &[
    "acala",
    "karura",
    "bifrost",
    "bifrost_dot",
    "interlay",
    "kintsugi",
    "hydradx_main",
    "basilisk",
    "centrifuge",
    "zeitgeist",
];

/// Chains whose local tokens live in `ormlTokens.accounts`
pub const ORML_TOKENS_CHAINS: &[&str] = &["pendulum", "amplitude", "mangatax_para"];

/// Chains with pallet-assets local tokens
pub const ASSETS_PALLET_CHAINS: &[&str] = &[
    "statemint",
    "statemine",
    "westend_assethub",
    "paseo_assethub",
    "astar",
    "shiden",
    "moonbeam",
    "calamari",
    "parallel",
    "phala",
    "khala",
];

/// Chains with a foreign-assets pallet keyed by XCM location
pub const FOREIGN_ASSETS_CHAINS: &[&str] = &[
    "statemint",
    "statemine",
    "westend_assethub",
    "paseo_assethub",
    "mythos",
];

/// Chains whose native balance is not held in `system.account`
pub const SYSTEM_ACCOUNT_EXCLUDED: &[&str] = &["equilibrium_parachain", "genshiro"];

/// Bittensor-family chains with subnet staking
pub const BITTENSOR_CHAINS: &[&str] = &["bittensor", "bittensor_testnet"];

/// Chains where aToken ("giga") balances are only readable via the currencies runtime API
pub const GIGA_TOKEN_CHAINS: &[&str] = &["hydradx_main", "hydradx_rococo"];

/// Multilocation key encoding for chains whose metadata does not reveal it
const XCM_VERSION_FALLBACK: &[(&str, XcmVersion)] = &[
    ("statemint", XcmVersion::V4),
    ("statemine", XcmVersion::V4),
    ("westend_assethub", XcmVersion::V4),
    ("paseo_assethub", XcmVersion::V4),
    ("mythos", XcmVersion::V3),
];

fn contains(group: &[&str], chain: &str) -> bool {
    group.contains(&chain)
}

pub fn uses_tokens_pallet(chain: &str) -> bool {
    contains(TOKENS_PALLET_CHAINS, chain)
}

pub fn uses_orml_tokens(chain: &str) -> bool {
    contains(ORML_TOKENS_CHAINS, chain)
}

pub fn uses_assets_pallet(chain: &str) -> bool {
    contains(ASSETS_PALLET_CHAINS, chain)
}

pub fn supports_foreign_assets(chain: &str) -> bool {
    contains(FOREIGN_ASSETS_CHAINS, chain)
}

pub fn uses_system_account(chain: &str) -> bool {
    !contains(SYSTEM_ACCOUNT_EXCLUDED, chain)
}

pub fn is_bittensor(chain: &str) -> bool {
    contains(BITTENSOR_CHAINS, chain)
}

pub fn has_giga_tokens(chain: &str) -> bool {
    contains(GIGA_TOKEN_CHAINS, chain)
}

/// Encoding version from the fixed table; chains not listed default to V4
pub fn fallback_xcm_version(chain: &str) -> XcmVersion {
    XCM_VERSION_FALLBACK
        .iter()
        .find(|(slug, _)| *slug == chain)
        .map(|(_, version)| *version)
        .unwrap_or(XcmVersion::V4)
}
