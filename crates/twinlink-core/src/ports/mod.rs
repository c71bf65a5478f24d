//! Ports - 抽象化レイヤー
//!
//! Correlator が依存する外部要素（transport、時刻、ID 生成）を trait として
//! 定義します。実装は `impls`（開発用・テスト用）か、この crate の外側に置きます。

pub mod clock;
pub mod id_generator;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::transport::{ResponseSink, Transport};
