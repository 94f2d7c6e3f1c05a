//! Application entry point for outage-bot.
//!
//! Initializes all components, starts the bot and the outage poller, and stops both on Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use log::info;
use outage_bot::bot::Bot;
use outage_bot::bot::Data;
use outage_bot::config::Config;
use outage_bot::logging::setup_logging;
use outage_bot::repository::Repository;
use outage_bot::service::Services;
use outage_bot::source::downdetector_source::DowndetectorSource;
use outage_bot::subscriber::OutageNotifier;
use outage_bot::task::outage_poller::OutagePoller;
use outage_bot::transport::telegram::TelegramClient;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let (config, _log_guard) = load_config()?;

    let db = setup_database(&config, init_start).await?;
    let client = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.bot_token,
        config.send_rate_per_second,
    )?);
    let services = setup_services(&config, db.clone(), client.clone()).await?;

    let bot = setup_bot(&config, client, services.clone(), init_start).await?;
    let poller = setup_poller(&config, &services, init_start).await;

    run(init_start).await?;

    poller.stop().await;
    bot.stop().await;
    db.close().await;
    info!("Shutdown complete.");
    Ok(())
}

fn load_config() -> Result<(Arc<Config>, WorkerGuard)> {
    let config = Config::from_env()?;
    let log_guard = setup_logging(&config)?;
    info!("Starting outage-bot...");
    debug!(
        "Loaded configuration with {} admins and {} monitored services.",
        config.admin_ids.len(),
        config.monitored_services.len()
    );
    Ok((Arc::new(config), log_guard))
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Database...");
    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

async fn setup_services(
    config: &Config,
    db: Arc<Repository>,
    client: Arc<TelegramClient>,
) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    let source = Arc::new(DowndetectorSource::new(config.fetch_timeout)?);
    let services = Services::new(config, db, client, source);
    services.outage.load_persisted_states().await?;
    Ok(Arc::new(services))
}

async fn setup_bot(
    config: &Arc<Config>,
    client: Arc<TelegramClient>,
    services: Arc<Services>,
    init_start: Instant,
) -> Result<Arc<Bot>> {
    info!("Starting bot...");
    let bot_username = match &config.bot_username {
        Some(username) => username.clone(),
        None => client.get_me().await?.username.unwrap_or_default(),
    };
    info!("Logged in as @{bot_username}");

    let data = Arc::new(Data {
        config: config.clone(),
        services,
        bot_username,
    });
    let bot = Bot::new(client, data);
    bot.start().await;
    info!(
        "Bot setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(bot)
}

async fn setup_poller(
    config: &Config,
    services: &Services,
    init_start: Instant,
) -> Arc<OutagePoller> {
    debug!("Setting up OutagePoller...");
    let notifier = Arc::new(OutageNotifier::new(
        services.broadcast.clone(),
        services.admin_log.clone(),
        config.templates.clone(),
    ));

    let poller = OutagePoller::new(
        services.outage.clone(),
        services.broadcast.clone(),
        services.admin_log.clone(),
        notifier,
        config.poll_interval,
        config.clear_broadcasts_daily,
    );
    poller.start().await;

    info!(
        "Monitoring {} services, threshold {} reports/hour ({:.2}s).",
        config.monitored_services.len(),
        services.outage.threshold(),
        init_start.elapsed().as_secs_f64()
    );
    poller
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "outage-bot is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}
