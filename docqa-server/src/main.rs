use docqa_server::{ServerConfig, run_server};
use docqa_telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    init_telemetry(&TelemetryConfig::default().with_format(config.log_format));

    run_server(config).await
}
