// Match notifier entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config (CLANWATCH_CONFIG or config/clanwatch.toml)
// 3. Wire the WebSocket source, replay prober and webhook dispatcher
// 4. Run the polling loop until the process is stopped

use anyhow::Context;
use tracing::info;

use clanwatch_app::poller::Poller;
use clanwatch_core::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("match notifier starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} tracked accounts, polling every {}s",
        config.players.len(),
        config.polling.interval_secs
    );

    let poller = Poller::from_config(&config)?;

    info!("starting the polling loop");
    poller
        .run()
        .await
        .context("could not fetch the initial matches")?;

    info!("exiting");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clanwatch_app=info,clanwatch_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
