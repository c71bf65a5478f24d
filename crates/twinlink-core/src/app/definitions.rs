//! FeatureDefinitionClient - Feature の definition を管理する API
//!
//! すべてのメソッドは非同期で、相手側が確定させた時点で `Ok(())`、
//! 失敗した時点で [`CorrelationError`] を返します。
//! future を drop すると送信中のリクエストはキャンセルされます。

use serde_json::json;
use tracing::warn;

use super::config::CallOptions;
use super::correlator::Correlator;
use super::retry::RetryPolicy;
use crate::domain::{CorrelationError, FeatureDefinition, OperationKind, ValidationError};

/// Create / update / delete for the definition of one Feature of one Thing.
#[derive(Clone)]
pub struct FeatureDefinitionClient {
    correlator: Correlator,
    thing_id: String,
    feature_id: String,
    retry: RetryPolicy,
}

impl FeatureDefinitionClient {
    /// Uses the retry policy from the correlator's config.
    pub fn new(
        correlator: Correlator,
        thing_id: impl Into<String>,
        feature_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let thing_id = thing_id.into();
        let feature_id = feature_id.into();
        if thing_id.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "thing_id" });
        }
        if feature_id.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "feature_id" });
        }
        let retry = correlator.config().retry.clone();
        Ok(Self {
            correlator,
            thing_id,
            feature_id,
            retry,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn feature_id(&self) -> &str {
        &self.feature_id
    }

    /// Replace the Feature's definition.
    pub async fn set_definition(
        &self,
        definition: &FeatureDefinition,
        options: CallOptions,
    ) -> Result<(), CorrelationError> {
        self.execute(OperationKind::Set, self.payload(Some(definition)), options)
            .await
    }

    /// Merge the given identifiers into the Feature's definition.
    pub async fn merge_definition(
        &self,
        definition: &FeatureDefinition,
        options: CallOptions,
    ) -> Result<(), CorrelationError> {
        self.execute(OperationKind::Merge, self.payload(Some(definition)), options)
            .await
    }

    /// Delete the Feature's definition.
    pub async fn delete_definition(&self, options: CallOptions) -> Result<(), CorrelationError> {
        self.execute(OperationKind::Delete, self.payload(None), options)
            .await
    }

    fn payload(&self, definition: Option<&FeatureDefinition>) -> serde_json::Value {
        let mut payload = json!({
            "thingId": self.thing_id,
            "featureId": self.feature_id,
        });
        if let Some(definition) = definition {
            payload["definition"] = json!(definition);
        }
        payload
    }

    async fn execute(
        &self,
        operation: OperationKind,
        payload: serde_json::Value,
        options: CallOptions,
    ) -> Result<(), CorrelationError> {
        let mut attempts = 1;
        loop {
            let result = self
                .correlator
                .submit(operation, payload.clone(), options)?
                .await;
            match result {
                Err(err) if self.retry.should_retry(attempts, &err) => {
                    let delay = self.retry.next_delay(attempts);
                    warn!(
                        thing_id = %self.thing_id,
                        feature_id = %self.feature_id,
                        operation = %operation,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        kind = ?err.kind(),
                        "Retrying feature definition command"
                    );
                    tokio::time::sleep(delay).await;
                    attempts += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::CorrelatorBuilder;
    use crate::domain::{CommandEnvelope, ResponseEnvelope};
    use crate::impls::{ChannelTransport, LoopbackTransport};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn definition() -> FeatureDefinition {
        FeatureDefinition::parse(["org.eclipse.ditto:fluxcapacitor:1.0.0"]).unwrap()
    }

    fn channel_client() -> (FeatureDefinitionClient, mpsc::UnboundedReceiver<CommandEnvelope>) {
        let (transport, commands) = ChannelTransport::new();
        let correlator = CorrelatorBuilder::new()
            .transport(Arc::new(transport))
            .build()
            .unwrap();
        let client = FeatureDefinitionClient::new(correlator, "org.acme:car-1", "engine").unwrap();
        (client, commands)
    }

    fn loopback_client() -> (FeatureDefinitionClient, Arc<LoopbackTransport>) {
        let (transport, responses) = LoopbackTransport::new(Duration::from_millis(1));
        let transport = Arc::new(transport);
        let correlator = CorrelatorBuilder::new()
            .transport(transport.clone())
            .build()
            .unwrap();
        let _ = correlator.listen(responses);
        let client = FeatureDefinitionClient::new(correlator, "org.acme:car-1", "engine").unwrap();
        (client, transport)
    }

    #[test]
    fn empty_ids_are_rejected() {
        let (transport, _rx) = ChannelTransport::new();
        let correlator = CorrelatorBuilder::new()
            .transport(Arc::new(transport))
            .build()
            .unwrap();

        assert_eq!(
            FeatureDefinitionClient::new(correlator.clone(), "", "engine").err(),
            Some(ValidationError::EmptyField { field: "thing_id" })
        );
        assert_eq!(
            FeatureDefinitionClient::new(correlator, "org.acme:car-1", " ").err(),
            Some(ValidationError::EmptyField { field: "feature_id" })
        );
    }

    #[tokio::test]
    async fn set_definition_sends_payload() {
        let (client, mut commands) = channel_client();

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.set_definition(&definition(), CallOptions::new()).await }
        });

        let command = commands.recv().await.unwrap();
        assert_eq!(command.operation(), OperationKind::Set);
        assert_eq!(
            command.payload(),
            &json!({
                "thingId": "org.acme:car-1",
                "featureId": "engine",
                "definition": ["org.eclipse.ditto:fluxcapacitor:1.0.0"],
            })
        );

        client
            .correlator
            .on_response(ResponseEnvelope::acknowledged(command.correlation_id()));
        call.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn delete_definition_omits_definition() {
        let (client, mut commands) = channel_client();

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.delete_definition(CallOptions::new()).await }
        });

        let command = commands.recv().await.unwrap();
        assert_eq!(command.operation(), OperationKind::Delete);
        assert!(command.payload().get("definition").is_none());

        client.correlator.on_response(ResponseEnvelope::failed(
            command.correlation_id(),
            "feature-definition-not-found",
        ));
        assert_eq!(
            call.await.unwrap().unwrap_err(),
            CorrelationError::remote("feature-definition-not-found")
        );
    }

    #[tokio::test]
    async fn set_merge_delete_against_loopback() {
        let (client, transport) = loopback_client();
        let extra = FeatureDefinition::parse(["org.acme:diagnostics:2.1.0"]).unwrap();

        client.set_definition(&definition(), CallOptions::new()).await.unwrap();
        client.merge_definition(&extra, CallOptions::new()).await.unwrap();
        assert_eq!(
            transport.definition("org.acme:car-1", "engine").await,
            Some(vec![
                "org.eclipse.ditto:fluxcapacitor:1.0.0".to_string(),
                "org.acme:diagnostics:2.1.0".to_string(),
            ])
        );

        client.delete_definition(CallOptions::new()).await.unwrap();
        assert_eq!(transport.definition("org.acme:car-1", "engine").await, None);

        let err = client.delete_definition(CallOptions::new()).await.unwrap_err();
        assert_eq!(err, CorrelationError::remote("feature-definition-not-found"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_are_retried_per_policy() {
        let (client, mut commands) = channel_client();
        let client = client.with_retry(RetryPolicy::default().with_max_attempts(3));

        let call = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .set_definition(
                        &definition(),
                        CallOptions::new().with_timeout(Duration::from_millis(100)),
                    )
                    .await
            }
        });

        // first two attempts time out, the third is acknowledged
        let first = commands.recv().await.unwrap();
        let second = commands.recv().await.unwrap();
        let third = commands.recv().await.unwrap();
        assert_ne!(first.correlation_id(), second.correlation_id());
        assert_ne!(second.correlation_id(), third.correlation_id());

        assert!(client
            .correlator
            .on_response(ResponseEnvelope::acknowledged(third.correlation_id())));
        call.await.unwrap().unwrap();

        let stats = client.correlator.stats();
        assert_eq!(stats.timeouts, 2);
        assert_eq!(stats.acknowledged, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_multiplier_retries_without_panicking() {
        let (client, mut commands) = channel_client();
        let client = client.with_retry(RetryPolicy {
            max_attempts: 3,
            multiplier: -1.0,
            ..RetryPolicy::default()
        });

        let call = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .set_definition(
                        &definition(),
                        CallOptions::new().with_timeout(Duration::from_millis(10)),
                    )
                    .await
            }
        });

        for _ in 0..3 {
            commands.recv().await.unwrap();
        }
        assert_eq!(
            call.await.unwrap().unwrap_err(),
            CorrelationError::Timeout { after: Duration::from_millis(10) }
        );
        assert_eq!(client.correlator.stats().timeouts, 3);
    }

    #[tokio::test]
    async fn remote_failures_are_not_retried() {
        let (client, mut commands) = channel_client();
        let client = client.with_retry(RetryPolicy::default().with_max_attempts(3));

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.merge_definition(&definition(), CallOptions::new()).await }
        });

        let command = commands.recv().await.unwrap();
        client
            .correlator
            .on_response(ResponseEnvelope::failed(command.correlation_id(), "forbidden"));

        assert_eq!(call.await.unwrap().unwrap_err(), CorrelationError::remote("forbidden"));
        assert!(commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropping_the_call_cancels_the_request() {
        let (client, mut commands) = channel_client();

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.set_definition(&definition(), CallOptions::new()).await }
        });
        let command = commands.recv().await.unwrap();
        call.abort();
        let _ = call.await;

        assert!(!client.correlator.is_pending(command.correlation_id()));
        assert_eq!(client.correlator.stats().cancelled, 1);
    }
}
