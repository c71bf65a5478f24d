use std::sync::Arc;

use anyhow::Context;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use twinlink_core::app::{CallOptions, CorrelatorBuilder, CorrelatorConfig, FeatureDefinitionClient};
use twinlink_core::domain::FeatureDefinition;
use twinlink_core::impls::LoopbackTransport;

/// config: 引数で JSON ファイルを渡せる（無ければデフォルト）
fn load_config() -> anyhow::Result<CorrelatorConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(CorrelatorConfig::default());
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("read config {path}"))?;
    CorrelatorConfig::from_json_str(&raw).with_context(|| format!("parse config {path}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    info!(?config, "Starting loopback demo");

    // (A) transport と correlator を用意（応答は listen() で流し込む）
    let (transport, responses) = LoopbackTransport::new(Duration::from_millis(20));
    let transport = Arc::new(transport);
    let correlator = CorrelatorBuilder::new()
        .transport(transport.clone())
        .config(config)
        .build()?;
    let listener = correlator.listen(responses);

    let client =
        FeatureDefinitionClient::new(correlator.clone(), "org.eclipse.ditto:car-1", "engine")?;
    let definition = FeatureDefinition::parse(["org.eclipse.ditto:fluxcapacitor:1.0.0"])?;
    let extra = FeatureDefinition::parse(["org.eclipse.ditto:diagnostics:2.1.0"])?;

    // (B) set → merge → delete
    client.set_definition(&definition, CallOptions::new()).await?;
    client.merge_definition(&extra, CallOptions::new()).await?;
    println!(
        "definition after merge: {:?}",
        transport.definition(client.thing_id(), client.feature_id()).await
    );
    client.delete_definition(CallOptions::new()).await?;

    // (C) 二度目の delete は相手側が失敗を返す
    match client.delete_definition(CallOptions::new()).await {
        Ok(()) => println!("second delete unexpectedly succeeded"),
        Err(err) => println!("second delete failed: {err}"),
    }

    // (D) 応答が来ないケースはタイムアウト
    transport.set_silent(true);
    let silent = client
        .set_definition(
            &definition,
            CallOptions::new().with_timeout(Duration::from_millis(100)),
        )
        .await;
    match silent {
        Ok(()) => println!("silent set unexpectedly succeeded"),
        Err(err) => println!("silent set: {err} (retryable={})", err.is_retryable()),
    }

    println!(
        "stats: {}",
        serde_json::to_string(&correlator.stats()).context("serialize stats")?
    );

    // (E) graceful shutdown
    correlator.shutdown();
    listener.await?;
    Ok(())
}
