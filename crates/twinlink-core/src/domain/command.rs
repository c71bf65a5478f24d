//! Outgoing management commands.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::CorrelationId;

/// The management operation a command performs on its target resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Set,
    Merge,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Merge => "merge",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token + operation + payload の“運搬用”データ。
///
/// payload の中身は Correlator からは不透明（transport と相手側だけが解釈する）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    correlation_id: CorrelationId,
    operation: OperationKind,
    payload: serde_json::Value,
    #[serde(default = "default_response_required")]
    response_required: bool,
}

fn default_response_required() -> bool {
    true
}

impl CommandEnvelope {
    pub fn new(
        correlation_id: CorrelationId,
        operation: OperationKind,
        payload: serde_json::Value,
        response_required: bool,
    ) -> Self {
        Self {
            correlation_id,
            operation,
            payload,
            response_required,
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Whether the counterpart is expected to answer with a
    /// [`ResponseEnvelope`](super::ResponseEnvelope).
    pub fn response_required(&self) -> bool {
        self.response_required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn operation_kind_serializes_as_upper_case() {
        assert_eq!(serde_json::to_string(&OperationKind::Set).unwrap(), "\"SET\"");
        assert_eq!(serde_json::to_string(&OperationKind::Merge).unwrap(), "\"MERGE\"");
        assert_eq!(serde_json::to_string(&OperationKind::Delete).unwrap(), "\"DELETE\"");
    }

    #[test]
    fn response_required_defaults_to_true_when_absent() {
        let id = CorrelationId::from_ulid(Ulid::new());
        let json = serde_json::json!({
            "correlation_id": id,
            "operation": "DELETE",
            "payload": {"thingId": "org.acme:car"},
        });

        let env: CommandEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(env.correlation_id(), id);
        assert_eq!(env.operation(), OperationKind::Delete);
        assert!(env.response_required());
    }
}
