//! LoopbackTransport - プロセス内で完結する擬似 twin ストア
//!
//! 受け取ったコマンドを (thing_id, feature_id) → definition の map に適用し、
//! `latency` 後に応答を返します。CLI デモと結合テスト用。
//!
//! # 振る舞い
//! - Set: definition を置き換える
//! - Merge: 既存に無い identifier を末尾に追加する（definition が無ければ作る）
//! - Delete: definition を消す。無ければ `feature-definition-not-found`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::domain::{
    CommandEnvelope, CorrelationId, OperationKind, ResponseEnvelope, TransportError,
};
use crate::ports::Transport;

pub const NOT_FOUND: &str = "feature-definition-not-found";
pub const INVALID_PAYLOAD: &str = "invalid-payload";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionCommand {
    thing_id: String,
    feature_id: String,
    #[serde(default)]
    definition: Option<Vec<String>>,
}

type FeatureKey = (String, String);

pub struct LoopbackTransport {
    definitions: Mutex<HashMap<FeatureKey, Vec<String>>>,
    responses: mpsc::UnboundedSender<ResponseEnvelope>,
    latency: Duration,
    reachable: AtomicBool,
    silent: AtomicBool,
}

impl LoopbackTransport {
    /// Returns the transport and the stream of responses it produces; hand the
    /// stream to [`Correlator::listen`](crate::app::Correlator::listen).
    pub fn new(latency: Duration) -> (Self, mpsc::UnboundedReceiver<ResponseEnvelope>) {
        let (responses, rx) = mpsc::unbounded_channel();
        let transport = Self {
            definitions: Mutex::new(HashMap::new()),
            responses,
            latency,
            reachable: AtomicBool::new(true),
            silent: AtomicBool::new(false),
        };
        (transport, rx)
    }

    /// While unreachable, every send fails with [`TransportError::Unreachable`].
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }

    /// While silent, commands are applied but never answered.
    pub fn set_silent(&self, silent: bool) {
        self.silent.store(silent, Ordering::Relaxed);
    }

    pub async fn definition(&self, thing_id: &str, feature_id: &str) -> Option<Vec<String>> {
        let definitions = self.definitions.lock().await;
        definitions
            .get(&(thing_id.to_string(), feature_id.to_string()))
            .cloned()
    }

    async fn apply(&self, command: &CommandEnvelope) -> Result<(), &'static str> {
        let parsed: DefinitionCommand =
            serde_json::from_value(command.payload().clone()).map_err(|_| INVALID_PAYLOAD)?;
        let key = (parsed.thing_id, parsed.feature_id);
        let mut definitions = self.definitions.lock().await;

        match (command.operation(), parsed.definition) {
            (OperationKind::Set, Some(ids)) => {
                definitions.insert(key, ids);
            }
            (OperationKind::Merge, Some(ids)) => {
                let current = definitions.entry(key).or_default();
                for id in ids {
                    if !current.contains(&id) {
                        current.push(id);
                    }
                }
            }
            (OperationKind::Delete, _) => {
                definitions.remove(&key).ok_or(NOT_FOUND)?;
            }
            (OperationKind::Set | OperationKind::Merge, None) => return Err(INVALID_PAYLOAD),
        }
        Ok(())
    }

    fn reply(&self, correlation_id: CorrelationId, result: Result<(), &'static str>) {
        let response = match result {
            Ok(()) => ResponseEnvelope::acknowledged(correlation_id),
            Err(reason) => ResponseEnvelope::failed(correlation_id, reason),
        };
        let responses = self.responses.clone();
        let latency = self.latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            // nobody listening any more
            let _ = responses.send(response);
        });
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, command: CommandEnvelope) -> Result<(), TransportError> {
        if !self.reachable.load(Ordering::Relaxed) {
            return Err(TransportError::Unreachable("loopback disabled".to_string()));
        }
        if self.responses.is_closed() {
            return Err(TransportError::Closed);
        }

        let result = self.apply(&command).await;
        debug!(
            correlation_id = %command.correlation_id(),
            operation = %command.operation(),
            ok = result.is_ok(),
            "Loopback applied command"
        );

        if command.response_required() && !self.silent.load(Ordering::Relaxed) {
            self.reply(command.correlation_id(), result);
        }
        Ok(())
    }
}
