//! Chat bot front end: long-polls the Bot API and dispatches updates.

pub mod chart;
pub mod checks;
pub mod commands;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod error_handler;
pub mod menu;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use log::error;
use log::info;
use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::bot::dispatcher::Dispatcher;
use crate::config::Config;
use crate::service::Services;
use crate::transport::telegram::TelegramClient;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Shared state available to every handler.
pub struct Data {
    pub config: Arc<Config>,
    pub services: Arc<Services>,
    /// Username without the leading `@`.
    pub bot_username: String,
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Bot {
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    running: Mutex<Option<RunningLoop>>,
}

impl Bot {
    pub fn new(client: Arc<TelegramClient>, data: Arc<Data>) -> Arc<Self> {
        let dispatcher = Arc::new(Dispatcher::new(data, client.clone()));
        Arc::new(Self {
            client,
            dispatcher,
            running: Mutex::new(None),
        })
    }

    /// Starts receiving updates. Does nothing when already started.
    pub async fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }

        info!("Starting update loop.");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.clone().update_loop(cancel.clone()));
        *running = Some(RunningLoop { cancel, handle });
    }

    /// Stops receiving updates once the update in progress is handled.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        info!("Stopping update loop.");
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            error!("Update loop ended abnormally: {e}");
        }
    }

    async fn update_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut offset = 0;
        let mut backoff = Duration::from_secs(1);

        loop {
            let updates = tokio::select! {
                _ = cancel.cancelled() => break,
                updates = self.client.get_updates(offset, LONG_POLL_TIMEOUT) => updates,
            };

            let updates = match updates {
                Ok(updates) => {
                    backoff = Duration::from_secs(1);
                    updates
                }
                Err(e) => {
                    warn!("Failed to fetch updates, retrying in {backoff:?}: {e}");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.dispatcher.handle_update(update).await;
            }
        }
        info!("Update loop stopped.");
    }
}
