use anyhow::Result;
use blescout::{
    ble::BtleTransport,
    config::{Config, ConfigError},
    logging,
    orchestrator::Orchestrator,
};
use clap::ErrorKind;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::get() {
        Ok(config) => config,
        Err(ConfigError::BadArgs(e))
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            print!("{}", e);
            return Ok(());
        }
        Err(e) => {
            // usage errors go to stdout and exit with status 1
            println!("{}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = logging::init(&config.log);

    let transport = BtleTransport::open(config.adapter.as_deref()).await?;
    let orchestrator = Orchestrator::new(Arc::new(transport), config.probe);
    orchestrator.run().await?;
    Ok(())
}
