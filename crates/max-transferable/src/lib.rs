//! Max-transferable calculation
//!
//! This crate prices a pending transfer and derives the largest amount that can
//! be sent from a free balance, covering same-chain transfers, XCM and bridge
//! routes, and fees paid in a non-native token.

pub mod calculator;
pub mod constants;
pub mod converters;
pub mod state;
pub mod tx_builder;

// Re-exports
pub use calculator::{calculate_max_transferable, MaxTransferableCalculator};
pub use constants::{bridges, fee_groups, placeholder, probe};
pub use converters::{amount_in, ExchangeRateConverter, FeeTokenConverter, ReservePoolConverter};
pub use state::{
    BitcoinFeeOptions, BridgeRoute, EvmFeeOptions, FeeChainType, FeeQuote, MaxTransferableResult,
    SimpleFeeOptions, SubstrateFeeOptions, TransferRequest,
};
pub use tx_builder::{bitcoin_vsize, probe_amount};
