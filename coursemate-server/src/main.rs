use clap::Parser;
use coursemate_server::{ServerConfig, run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    telemetry::init_tracing(config.log_json);
    run_server(config).await
}
