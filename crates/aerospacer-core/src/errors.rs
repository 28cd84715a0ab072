//! Error types for the Aerospacer ledger replica

use thiserror::Error;

/// Core errors that can occur while reading and deriving ledger state
#[derive(Debug, Error)]
pub enum Error {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// RPC connection and query errors
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC endpoint unreachable at {url}")]
    Unreachable { url: String },

    #[error("RPC returned error {code}: {message}")]
    ApiError { code: i64, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Account data that cannot be trusted as a record of the requested kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{kind} record too short: need at least {expected} bytes, got {found}")]
    TooShort {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{kind} record: {length}-byte field at offset {offset} overruns {available} available bytes")]
    LengthOverrun {
        kind: &'static str,
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("{kind} record: string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { kind: &'static str, offset: usize },

    #[error("{kind} record: discriminator mismatch (expected {expected}, found {found})")]
    DiscriminatorMismatch {
        kind: &'static str,
        expected: String,
        found: String,
    },
}

/// Protocol-level derivation errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Protocol state unavailable: {reason}")]
    StateUnavailable { reason: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u64, available: u64 },

    #[error("Invalid ordering: {reason}")]
    InvalidOrdering { reason: String },

    #[error("Collateral denom mismatch: expected {expected}, found {found}")]
    DenomMismatch { expected: String, found: String },
}

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

impl DecodeError {
    /// Every decode failure belongs to the malformed-record family
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "malformed_record_too_short",
            Self::LengthOverrun { .. } => "malformed_record_length_overrun",
            Self::InvalidUtf8 { .. } => "malformed_record_invalid_utf8",
            Self::DiscriminatorMismatch { .. } => "malformed_record_discriminator",
        }
    }
}

impl ProtocolError {
    /// Get a machine-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StateUnavailable { .. } => "state_unavailable",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InsufficientLiquidity { .. } => "insufficient_liquidity",
            Self::InvalidOrdering { .. } => "invalid_ordering",
            Self::DenomMismatch { .. } => "denom_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        let err = ProtocolError::InvalidAmount {
            message: "test".into(),
        };
        assert_eq!(err.error_code(), "invalid_amount");

        let err = ProtocolError::InsufficientLiquidity {
            requested: 100,
            available: 50,
        };
        assert_eq!(err.error_code(), "insufficient_liquidity");
        assert_eq!(
            err.to_string(),
            "Insufficient liquidity: requested 100, available 50"
        );
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TooShort {
            kind: "UserDebtAmount",
            expected: 48,
            found: 12,
        };
        assert_eq!(err.error_code(), "malformed_record_too_short");
        assert_eq!(
            err.to_string(),
            "UserDebtAmount record too short: need at least 48 bytes, got 12"
        );
    }

    #[test]
    fn test_error_from_conversions() {
        let err: Error = DecodeError::InvalidUtf8 {
            kind: "UserCollateralAmount",
            offset: 44,
        }
        .into();
        assert!(matches!(err, Error::Decode(_)));

        let err: Error = RpcError::Timeout { secs: 30 }.into();
        assert!(err.to_string().contains("30s"));
    }
}
