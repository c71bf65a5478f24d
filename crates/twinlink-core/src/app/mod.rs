//! App - アプリケーション層
//!
//! ports を組み合わせて、コマンドと応答の対応付けを実装します。
//!
//! # 主要コンポーネント
//! - **Correlator**: トークン発行・pending テーブル・タイムアウト・キャンセル
//! - **ResponseHandle**: 呼び出し側に返す単一解決のハンドル
//! - **CorrelatorBuilder**: 構築と起動時検証
//! - **FeatureDefinitionClient**: set / merge / delete definition の API

pub mod builder;
pub mod config;
pub mod correlator;
pub mod definitions;
pub mod handle;
pub mod retry;
pub mod stats;

pub use self::builder::{BuildError, CorrelatorBuilder};
pub use self::config::{CallOptions, CorrelatorConfig};
pub use self::correlator::Correlator;
pub use self::definitions::FeatureDefinitionClient;
pub use self::handle::ResponseHandle;
pub use self::retry::RetryPolicy;
pub use self::stats::{CorrelatorStats, StatsSnapshot};
