//! ChannelTransport - コマンドを tokio mpsc に流すだけの transport
//!
//! テストでは受信側を「相手側」として扱い、届いたコマンドを見てから
//! `Correlator::on_response()` で応答を返します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{CommandEnvelope, TransportError};
use crate::ports::Transport;

pub struct ChannelTransport {
    commands: mpsc::UnboundedSender<CommandEnvelope>,
}

impl ChannelTransport {
    /// Returns the transport and the receiving end of its command stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CommandEnvelope>) {
        let (commands, rx) = mpsc::unbounded_channel();
        (Self { commands }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, command: CommandEnvelope) -> Result<(), TransportError> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrelationId, OperationKind};
    use ulid::Ulid;

    fn command() -> CommandEnvelope {
        CommandEnvelope::new(
            CorrelationId::from(Ulid::new()),
            OperationKind::Set,
            serde_json::json!({}),
            true,
        )
    }

    #[tokio::test]
    async fn forwards_commands() {
        let (transport, mut rx) = ChannelTransport::new();
        let cmd = command();

        transport.send(cmd.clone()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), cmd);
    }

    #[tokio::test]
    async fn dropped_receiver_means_closed() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);

        assert_eq!(transport.send(command()).await, Err(TransportError::Closed));
    }
}
