use std::io::Read;

use anyhow::Context;
use envconfig::Envconfig;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use feature_serving::config::Config;
use feature_serving::serving::OnlineServingService;
use feature_serving::types::GetOnlineFeaturesRequest;

/// Serves a single online features request: JSON request on stdin, JSON
/// response on stdout. Logs go to stderr.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init_from_env().context("Invalid configuration")?;

    let log_layer = {
        let base_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        if *config.debug {
            base_layer
                .with_ansi(true)
                .with_filter(EnvFilter::from_default_env())
                .boxed()
        } else {
            base_layer
                .json()
                .with_filter(EnvFilter::from_default_env())
                .boxed()
        }
    };
    tracing_subscriber::registry().with(log_layer).init();

    let service = OnlineServingService::from_config(&config)
        .await
        .context("Failed to start online serving")?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    let request: GetOnlineFeaturesRequest =
        serde_json::from_str(&input).context("Request is not a valid online features request")?;

    let response = service.get_online_features(&request).await?;
    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}
