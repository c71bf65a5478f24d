//! Transport port - コマンド送信と応答受信の抽象化
//!
//! 具体的な wire protocol（websocket / AMQP など）はこの crate の外側の責務。
//! ここでは「送る」と「届いた応答を渡す」の二つだけを定義します。

use async_trait::async_trait;

use crate::domain::{CommandEnvelope, ResponseEnvelope, TransportError};

/// Dispatches commands to the counterpart.
///
/// `send` resolves once the transport accepted the command; it must not wait
/// for the counterpart's response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, command: CommandEnvelope) -> Result<(), TransportError>;
}

/// Receives response frames from a transport.
///
/// Implementations must not block: they are called from the transport's own
/// execution context.
pub trait ResponseSink: Send + Sync {
    fn on_message(&self, response: ResponseEnvelope);
}
