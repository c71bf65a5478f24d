//! State - pending request の状態
//!
//! # 状態遷移
//! - pending: 応答待ち（テーブル挿入と同時に入る）
//! - acknowledged: 相手側が成功を返した
//! - remote_failed: 相手側が失敗を返した
//! - timed_out: 期限内に応答がなかった
//! - cancelled: 呼び出し側が取り消した
//! - dispatch_failed: transport が送信を拒否した
//! - closed: Correlator が停止した
//!
//! pending 以外はすべて終端状態で、それ以上遷移しない。

use crate::domain::errors::CorrelationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Pending,
    Acknowledged,
    RemoteFailed,
    TimedOut,
    Cancelled,
    DispatchFailed,
    Closed,
}

impl RequestState {
    /// The terminal state a completion result corresponds to.
    pub fn from_result(result: &Result<(), CorrelationError>) -> Self {
        match result {
            Ok(()) => Self::Acknowledged,
            Err(CorrelationError::Remote { .. }) => Self::RemoteFailed,
            Err(CorrelationError::Timeout { .. }) => Self::TimedOut,
            Err(CorrelationError::Cancelled) => Self::Cancelled,
            Err(CorrelationError::Dispatch(_)) => Self::DispatchFailed,
            // validation never reaches a pending request
            Err(CorrelationError::Closed) | Err(CorrelationError::Validation(_)) => Self::Closed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
