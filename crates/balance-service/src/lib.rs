//! balance-service: Multi-chain balance subscriptions
//!
//! A subscription session fans out to one adapter per (chain, pallet or token
//! family). Adapters read through the capability traits in `chain-client` and
//! push canonical `BalanceItem`s into a shared sink; the session forwards them
//! to the caller until its handle is cancelled.
//!
//! - [`dispatcher`]: address partitioning and per-chain adapter selection
//! - [`adapters`]: EVM, Bitcoin, TON, Cardano and Substrate pallet adapters
//! - [`locks`]: lock/hold/freeze classification into locked-balance buckets
//! - [`handle`] / [`sink`]: cancellation tree and balance fan-in

pub mod adapters;
pub mod address;
pub mod chain_groups;
pub mod dispatcher;
pub mod handle;
pub mod locks;
pub mod registry;
pub mod service;
pub mod sink;

pub use address::{AddressFormat, AddressKind, DefaultAddressFormat};
pub use dispatcher::SubscribeRequest;
pub use handle::{CancelFlag, SubscriptionHandle};
pub use registry::Registry;
pub use service::{subscribe_balance, subscribe_balance_stream, BalanceCallback, BalanceService};
pub use sink::{BalanceSink, BalanceStream};
