use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio_util::sync::CancellationToken;

use helioview::bootstrap;
use helioview::common::WORKER_RUNTIME;
use helioview::common::config::Config;
use helioview::processors::Toolset;
use helioview::scheduler;
use helioview::tasks::TaskContext;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    bootstrap::initialize_logger();

    let config = Config::from_env()?;
    info!("Starting daemon (window {}h, {} workers)", config.window_hours, config.max_concurrency);

    bootstrap::check_external_tools(&config);
    bootstrap::initialize_folders(&config)?;

    WORKER_RUNTIME.block_on(async {
        let cancel = CancellationToken::new();
        bootstrap::install_signal_handlers(cancel.clone())?;

        let tools = Toolset::production(&config);
        let ctx = Arc::new(TaskContext::new(config, tools, cancel.clone()));

        scheduler::run(ctx, cancel).await;
        Ok(())
    })
}
