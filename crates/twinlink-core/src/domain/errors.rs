//! Errors - エラー型と分類
//!
//! 呼び出し側に届く失敗はすべて [`CorrelationError`] です。
//! トークン発行前の入力エラーだけが同期的に返り、それ以外は
//! [`ResponseHandle`](crate::app::ResponseHandle) の失敗として届きます。

use std::time::Duration;

use thiserror::Error;

/// ErrorKind は失敗の運用分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: インフラエラー（transport の切断など）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Input rejected at the boundary, before any token exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload is missing")]
    MissingPayload,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("feature definition must contain at least one identifier")]
    EmptyDefinition,

    #[error("invalid definition identifier {0:?}: expected `namespace:name:version`")]
    InvalidIdentifier(String),

    #[error("retry multiplier must be finite and not negative")]
    InvalidRetryMultiplier,
}

/// Failure reported by a [`Transport`](crate::ports::Transport) when dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport channel is closed")]
    Closed,

    #[error("transport unreachable: {0}")]
    Unreachable(String),
}

/// Terminal failure of a correlated command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] TransportError),

    /// The reason is forwarded verbatim from the counterpart.
    #[error("remote failure: {reason}")]
    Remote { reason: String },

    #[error("no response within {after:?}")]
    Timeout { after: Duration },

    #[error("request cancelled")]
    Cancelled,

    #[error("correlator closed before a response arrived")]
    Closed,
}

impl CorrelationError {
    pub fn remote(reason: impl Into<String>) -> Self {
        Self::Remote {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Remote { .. } | Self::Cancelled => ErrorKind::Permanent,
            Self::Timeout { .. } => ErrorKind::Transient,
            Self::Dispatch(_) | Self::Closed => ErrorKind::Infrastructure,
        }
    }

    /// Timeouts and dispatch failures may succeed on a fresh attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Dispatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::validation(
        CorrelationError::from(ValidationError::MissingPayload),
        ErrorKind::Permanent,
        false
    )]
    #[case::dispatch(
        CorrelationError::from(TransportError::Closed),
        ErrorKind::Infrastructure,
        true
    )]
    #[case::remote(CorrelationError::remote("not-found"), ErrorKind::Permanent, false)]
    #[case::timeout(
        CorrelationError::Timeout { after: Duration::from_millis(100) },
        ErrorKind::Transient,
        true
    )]
    #[case::cancelled(CorrelationError::Cancelled, ErrorKind::Permanent, false)]
    #[case::closed(CorrelationError::Closed, ErrorKind::Infrastructure, false)]
    fn classification(
        #[case] err: CorrelationError,
        #[case] kind: ErrorKind,
        #[case] retryable: bool,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn remote_reason_is_forwarded_verbatim() {
        let err = CorrelationError::remote("not-found");
        assert_eq!(err, CorrelationError::Remote { reason: "not-found".to_string() });
        assert_eq!(err.to_string(), "remote failure: not-found");
    }
}
