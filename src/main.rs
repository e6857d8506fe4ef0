mod app;
mod bridge;
mod classifier;
mod config;
mod context;
mod db;
mod domain;
mod infrastructure;
mod presenter;
mod redaction;
mod tasks;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

const RUNTIME_GRACE: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    shutdown::run_with_grace(runtime, RUNTIME_GRACE, async move {
        let (shutdown, _) = shutdown::Shutdown::new();
        shutdown::install_signal_handlers(shutdown.clone());

        let app = app::SiteGuardApp::initialize(config, paths, shutdown.clone()).await?;
        app.run().await
    })
}
