//! Correlation tokens.
//!
//! # ULID ベースの ID
//! 送信コマンドとその応答を結びつけるトークンには ULID を使用します。
//!
//! - **時刻でソート可能**: 先頭 48bit が timestamp なので、発行順に並ぶ
//! - **調整不要**: 複数タスクから同時に発行しても衝突はほぼ起きない
//! - **128-bit**: UUID と同じサイズ
//!
//! それでも「生きているトークンを二度使わない」ことは Correlator 側で
//! テーブルと突き合わせて保証します（ID 生成だけには頼らない）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Display で使うプレフィックス
const PREFIX: &str = "corr-";

/// Identifier linking an outgoing command to its eventual response.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Ulid);

impl CorrelationId {
    /// ULID から CorrelationId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Milliseconds since the Unix epoch encoded in the token.
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl From<Ulid> for CorrelationId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.0)
    }
}

/// Parse error for the textual `corr-<ulid>` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid correlation id: {0}")]
pub struct ParseCorrelationIdError(String);

impl FromStr for CorrelationId {
    type Err = ParseCorrelationIdError;

    /// `corr-` プレフィックスは省略可能
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self)
            .map_err(|_| ParseCorrelationIdError(s.to_string()))
    }
}
