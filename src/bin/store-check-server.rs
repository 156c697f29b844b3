use anyhow::Result;
use clap::Parser;
use storefront_probe::logging;
use storefront_probe::server::{self, ServerArgs};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER);

    let args = ServerArgs::parse();
    let config = args.load_config()?;
    tracing::debug!("loaded config: {:?}", config);

    server::serve(config).await?;
    Ok(())
}
