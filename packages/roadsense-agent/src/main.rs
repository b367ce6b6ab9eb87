use roadsense_agent::{
    AgentConfig, AgentRunner, BatchSizeRange, CyclicBatchReader, MqttTransport,
    OrderedPublisher,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadsense_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env()?;
    info!("Starting roadsense-agent v{}", VERSION);
    info!("Broker: {}", config.broker_address());

    let batch_size = BatchSizeRange::new(config.batch_size_min, config.batch_size_max)?;
    let reader = CyclicBatchReader::new(config.sources.clone(), batch_size);

    let transport = Arc::new(MqttTransport::connect(
        &config.mqtt_client_id,
        &config.mqtt_host,
        config.mqtt_port,
    ));
    let publisher = OrderedPublisher::new(transport.clone(), config.topics.clone());
    let mut runner = AgentRunner::new(reader, publisher, config.delay);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = runner.run(cancel).await;
    transport.disconnect().await;

    match result {
        Ok(batches) => {
            info!("Agent stopped after publishing {} batches", batches);
            Ok(())
        }
        Err(e) => {
            error!("Agent failed: {}", e);
            Err(e.into())
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, finishing current batch");
            cancel.cancel();
        }
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}
