use clap::Parser;
use tracing_subscriber::EnvFilter;

use hotel_block_watch::{Cli, NotifierSet, ReqwestSession, RunMode, Watcher};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;

    match config {
        RunMode::TestNotifications {
            notifiers,
            alert_target,
        } => {
            let notifiers = NotifierSet::from_settings(&notifiers)?;
            notifiers.send_test_alerts(&alert_target).await;
        }
        RunMode::Watch(config) => {
            let http = ReqwestSession::new()?;
            let notifiers = NotifierSet::from_settings(&config.notifiers)?;
            tracing::info!(channels = ?notifiers.channel_names(), "watcher starting");
            Watcher::new(&config, http, notifiers).run().await;
        }
    }

    Ok(())
}
