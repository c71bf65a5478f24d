//! IdGenerator port - correlation token 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::CorrelationId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は correlation token を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから同時に submit される）
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> CorrelationId;
}

impl<G: IdGenerator + ?Sized> IdGenerator for std::sync::Arc<G> {
    fn generate(&self) -> CorrelationId {
        (**self).generate()
    }
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って timestamp 部分を決めるので、FixedClock を渡せば
/// timestamp が固定されたトークンを作れます（ランダム部分は毎回異なる）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate(&self) -> CorrelationId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        CorrelationId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
