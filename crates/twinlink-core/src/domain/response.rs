//! Incoming responses.

use serde::{Deserialize, Serialize};

use super::ids::CorrelationId;

/// What the counterpart reported for a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Acknowledged,
    /// The reason is opaque to the correlator.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub correlation_id: CorrelationId,
    pub outcome: ResponseOutcome,
}

impl ResponseEnvelope {
    pub fn acknowledged(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            outcome: ResponseOutcome::Acknowledged,
        }
    }

    pub fn failed(correlation_id: CorrelationId, reason: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: ResponseOutcome::Failed(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn outcome_is_tagged_enum() {
        let id = CorrelationId::from_ulid(Ulid::new());

        let v = serde_json::to_value(ResponseEnvelope::failed(id, "not-found")).unwrap();
        // {"correlation_id":"...","outcome":{"status":"failed","reason":"not-found"}}
        assert_eq!(v["outcome"]["status"], "failed");
        assert_eq!(v["outcome"]["reason"], "not-found");

        let v = serde_json::to_value(ResponseEnvelope::acknowledged(id)).unwrap();
        assert_eq!(v["outcome"]["status"], "acknowledged");
    }
}
