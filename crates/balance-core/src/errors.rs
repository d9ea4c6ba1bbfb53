//! Error types for balance tracking and fee estimation

use thiserror::Error;

/// Top-level errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Chain client errors
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Chain client for {chain} is not ready")]
    NotReady { chain: String },

    #[error("RPC error: {message}")]
    Rpc { message: String },

    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Call reverted: {reason}")]
    CallFailed { reason: String },

    #[error("Not supported by this chain: {feature}")]
    Unsupported { feature: String },

    #[error("Subscription closed")]
    SubscriptionClosed,
}

/// Adapter startup errors
///
/// An adapter that fails to start is omitted: it produces no handle and no emissions.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("No {family} client for chain {chain}")]
    MissingClient { chain: String, family: String },

    #[error("Cannot resolve on-chain id for {slug}")]
    UnresolvedAsset { slug: String },

    #[error("Asset {slug} is not supported by the {adapter} adapter")]
    UnsupportedAsset { slug: String, adapter: String },

    #[error("Failed to start subscription: {0}")]
    Client(#[from] ClientError),
}

/// Fee estimation and max-transferable errors
#[derive(Debug, Clone, Error)]
pub enum FeeError {
    #[error("Destination token is required for cross-chain transfers")]
    MissingDestinationToken,

    #[error("No {family} client for chain {chain}")]
    MissingClient { chain: String, family: String },

    #[error("Fee estimation failed: {message}")]
    EstimationFailed { message: String },

    #[error("Unable to build transfer transaction: {message}")]
    TransactionBuild { message: String },

    #[error("Unable to convert fee into {token}: {reason}")]
    Conversion { token: String, reason: String },

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl ClientError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotReady { .. } => "client_not_ready",
            Self::Rpc { .. } => "rpc_error",
            Self::Timeout { .. } => "timeout",
            Self::Decode(_) => "decode_error",
            Self::CallFailed { .. } => "call_failed",
            Self::Unsupported { .. } => "unsupported",
            Self::SubscriptionClosed => "subscription_closed",
        }
    }
}

impl FeeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDestinationToken => "missing_destination_token",
            Self::MissingClient { .. } => "missing_client",
            Self::EstimationFailed { .. } => "estimation_failed",
            Self::TransactionBuild { .. } => "transaction_build_failed",
            Self::Conversion { .. } => "fee_conversion_failed",
            Self::Client(e) => e.error_code(),
        }
    }

    /// Whether the error reflects caller misuse rather than a chain condition
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::MissingDestinationToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_error_codes() {
        let err = FeeError::MissingDestinationToken;
        assert_eq!(err.error_code(), "missing_destination_token");
        assert!(err.is_programmer_error());

        let err = FeeError::from(ClientError::Timeout { millis: 30_000 });
        assert_eq!(err.error_code(), "timeout");
        assert!(!err.is_programmer_error());
    }

    #[test]
    fn test_error_display() {
        let err = AdapterError::UnresolvedAsset {
            slug: "statemint-LOCAL-X".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve on-chain id for statemint-LOCAL-X"
        );
    }
}
