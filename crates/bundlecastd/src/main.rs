use anyhow::Result;
use bundlecast_core::init_tracing;
use bundlecastd::Config;
use clap::Parser;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(config.json, level);

    bundlecastd::server::run(config).await
}
