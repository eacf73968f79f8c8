use clap::Parser;
use docqa_cli::Cli;
use docqa_telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&TelemetryConfig::default().with_format(cli.log_format));

    cli.run().await
}
