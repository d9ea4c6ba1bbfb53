//! Fee constants
//!
//! Bridge route tables, fee-token conversion groups, probe amounts and the
//! placeholder recipients used when building representative transactions.

/// Cross-chain bridge routes, as (source chain, destination chain) pairs
pub mod bridges {
    /// Polygon zkEVM bridge
    pub const POLYGON_BRIDGE: &[(&str, &str)] = &[
        ("ethereum", "polygonzkEvm"),
        ("polygonzkEvm", "ethereum"),
        ("sepolia_ethereum", "polygonZkEvm_cardona"),
        ("polygonZkEvm_cardona", "sepolia_ethereum"),
    ];

    /// Polygon PoS bridge
    pub const POS_BRIDGE: &[(&str, &str)] = &[
        ("ethereum", "polygon"),
        ("polygon", "ethereum"),
        ("sepolia_ethereum", "polygon_amoy"),
        ("polygon_amoy", "sepolia_ethereum"),
    ];

    /// Avail vector bridge
    pub const AVAIL_BRIDGE: &[(&str, &str)] = &[
        ("avail_mainnet", "ethereum"),
        ("ethereum", "avail_mainnet"),
        ("availTuringTest", "sepolia_ethereum"),
        ("sepolia_ethereum", "availTuringTest"),
    ];

    /// Snowbridge between Ethereum and the Polkadot asset hub
    pub const SNOWBRIDGE: &[(&str, &str)] = &[
        ("ethereum", "statemint"),
        ("statemint", "ethereum"),
        ("sepolia_ethereum", "westend_assethub"),
        ("westend_assethub", "sepolia_ethereum"),
    ];

    /// Ethereum network id Snowbridge locations refer to, per source chain
    pub const SNOWBRIDGE_ETHEREUM_CHAIN_ID: &[(&str, u64)] =
        &[("statemint", 1), ("westend_assethub", 11_155_111)];
}

/// Chains whose fees can be paid in a local token
pub mod fee_groups {
    /// Fees converted through an asset-conversion (constant product) pool
    pub const RESERVE_POOL_CHAINS: &[&str] = &[
        "statemint",
        "statemine",
        "westend_assethub",
        "paseo_assethub",
    ];

    /// Fees converted through a per-currency exchange rate
    pub const EXCHANGE_RATE_CHAINS: &[&str] = &["hydradx_main", "hydradx_rococo"];

    /// Asset-conversion LP fee numerator (0.3% fee = 997/1000)
    pub const POOL_FEE_NUM: u64 = 997;

    /// Asset-conversion LP fee denominator
    pub const POOL_FEE_DENOM: u64 = 1000;

    /// FixedU128 scale (18 decimals)
    pub const FIXED_U128_SCALE: u128 = 1_000_000_000_000_000_000;

    /// pallet-assets instance index on asset hubs
    pub const ASSETS_PALLET_INSTANCE: u64 = 50;
}

/// Non-zero transfer amounts used when pricing bridge transfers
pub mod probe {
    /// Plain XCM transfers
    pub const XCM: u64 = 1_000_000;

    /// Polygon zkEVM and PoS bridges
    pub const POLYGON: u64 = 1;

    /// Avail bridge messages (1 AVAIL)
    pub const AVAIL: u128 = 1_000_000_000_000_000_000;

    /// Snowbridge transfers
    pub const SNOWBRIDGE: u64 = 1_000_000_000;
}

/// Recipients of representative transactions; nothing is ever submitted
pub mod placeholder {
    pub const EVM_RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";

    pub const SUBSTRATE_RECIPIENT: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    /// Avail bridge recipients are 32-byte hashes
    pub const H256_RECIPIENT: &str =
        "0x000000000000000000000000000000000000000000000000000000000000dead";

    pub const TON_RECIPIENT: &str =
        "0:0000000000000000000000000000000000000000000000000000000000000000";
}

/// Bitcoin transaction size constants (P2WPKH, vbytes)
pub mod bitcoin {
    pub const TX_OVERHEAD_VBYTES: u64 = 11;
    pub const INPUT_VBYTES: u64 = 68;
    pub const OUTPUT_VBYTES: u64 = 31;
}
