mod cli;

use soulscout_cli::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
