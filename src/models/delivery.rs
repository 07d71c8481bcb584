// src/models/delivery.rs
use thiserror::Error;

/// Classification of a single failed send, derived from the provider's
/// per-message error status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    #[error("registration token is no longer valid")]
    Unregistered,

    #[error("malformed registration token or message")]
    InvalidToken,

    #[error("delivery quota exceeded")]
    QuotaExceeded,

    #[error("delivery provider unavailable")]
    Unavailable,

    #[error("delivery failed: {0}")]
    Other(String),
}

/// One failed message within a fan-out, kept for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub token: String,
    pub kind: DeliveryErrorKind,
}
