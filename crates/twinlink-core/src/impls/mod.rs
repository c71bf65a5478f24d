//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **ChannelTransport**: コマンドを mpsc に流すだけ（テスト用）
//! - **LoopbackTransport**: プロセス内の擬似 twin ストア（デモ・結合テスト用）
//!
//! websocket / AMQP などの本番用 transport はこの crate の外側に置きます。

pub mod channel;
pub mod loopback;

pub use self::channel::ChannelTransport;
pub use self::loopback::LoopbackTransport;
