use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use noclouds::config::NoCloudsConfig;
use noclouds::scheduler::{parse_schedule, run_schedule};
use noclouds::telegram::run_polling;
use noclouds::telemetry::init_tracing;
use noclouds::{
    AlertService, ChatHandler, FileStateStore, ForecastService, OpenMeteoClient, TelegramClient,
    VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NoCloudsConfig::load().context("Failed to load configuration")?;
    let telemetry = init_tracing(&config.logging)?;

    info!(version = VERSION, "Starting noclouds");
    let result = run(config).await;
    if let Err(e) = &result {
        error!(error = %e, "noclouds stopped with an error");
    }

    telemetry.shutdown();
    result
}

async fn run(config: NoCloudsConfig) -> Result<()> {
    let (_, chat_id) = config.telegram.credentials()?;
    let schedule = parse_schedule(&config.schedule.cron)?;

    let state = Arc::new(FileStateStore::new(&config.state.file_path));
    if let Err(e) = state.initialize().await {
        error!(
            error = %e,
            path = %state.path().display(),
            "Could not reset notification state, continuing"
        );
    }

    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);
    telegram.get_me().await.context("Telegram rejected the bot token")?;

    let source = Arc::new(OpenMeteoClient::new(&config.weather, &config.location)?);
    let forecasts = ForecastService::new(source, config.thresholds.clone());

    let alerts = Arc::new(AlertService::new(
        chat_id,
        forecasts.clone(),
        state,
        telegram.clone(),
    ));
    let handler = ChatHandler::new(chat_id, forecasts, telegram.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(run_schedule(schedule, alerts, shutdown_rx.clone()));

    tokio::select! {
        () = run_polling(telegram.as_ref(), &handler, shutdown_rx) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown requested");
        }
    }

    let _ = shutdown_tx.send(true);
    scheduler.await.context("Scheduler task panicked")?;

    info!("noclouds stopped");
    Ok(())
}
