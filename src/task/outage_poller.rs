//! Background task that polls every monitored service on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::monitor::OutageEvent;
use crate::service::admin_log::AdminLog;
use crate::service::broadcast_service::BroadcastService;
use crate::service::outage_service::OutageService;
use crate::subscriber::Subscriber;

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Sleeps for the poll interval, then checks every service and announces transitions.
///
/// A failure while checking or announcing one service is logged and the cycle moves on to the
/// next one.
pub struct OutagePoller {
    outage: Arc<OutageService>,
    broadcast: Arc<BroadcastService>,
    admin_log: Arc<AdminLog>,
    notifier: Arc<dyn Subscriber<OutageEvent>>,
    poll_interval: Duration,
    clear_broadcasts_daily: bool,
    running: Mutex<Option<RunningLoop>>,
}

impl OutagePoller {
    pub fn new(
        outage: Arc<OutageService>,
        broadcast: Arc<BroadcastService>,
        admin_log: Arc<AdminLog>,
        notifier: Arc<dyn Subscriber<OutageEvent>>,
        poll_interval: Duration,
        clear_broadcasts_daily: bool,
    ) -> Arc<Self> {
        info!("Initializing OutagePoller with poll interval {poll_interval:?}");
        Arc::new(Self {
            outage,
            broadcast,
            admin_log,
            notifier,
            poll_interval,
            clear_broadcasts_daily,
            running: Mutex::new(None),
        })
    }

    /// Starts the poll loop. Does nothing when it is already running.
    pub async fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }

        info!("Starting OutagePoller loop.");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.clone().poll_loop(cancel.clone()));
        *running = Some(RunningLoop { cancel, handle });
    }

    /// Stops the poll loop and waits for the cycle in progress to finish.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        info!("Stopping OutagePoller loop.");
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            error!("OutagePoller loop ended abnormally: {e}");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    async fn poll_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.poll_interval) => {}
            }
            self.poll_once().await;
        }
        info!("OutagePoller loop stopped.");
    }

    /// Runs one poll cycle and returns the transitions it announced.
    pub async fn poll_once(&self) -> Vec<OutageEvent> {
        debug!("Polling monitored services.");
        let mut events = Vec::new();

        for name in self.outage.service_names().await {
            let event = match self.outage.check_service(&name).await {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    error!("Error checking service {name}: {e}");
                    continue;
                }
            };

            info!("Service {name} transition: {:?}", event.transition);
            if let Err(e) = self.notifier.callback(event.clone()).await {
                error!("Error announcing outage of {name}: {e:?}");
            }
            events.push(event);
        }

        if self.clear_broadcasts_daily {
            self.prune_broadcasts().await;
        }

        debug!("Finished polling monitored services.");
        events
    }

    async fn prune_broadcasts(&self) {
        match self.broadcast.prune_before_today().await {
            Ok(0) => {}
            Ok(deleted) => {
                self.admin_log
                    .notify(&format!(
                        "Cleared {deleted} broadcast records from previous days."
                    ))
                    .await;
            }
            Err(e) => error!("Failed to clear old broadcast records: {e}"),
        }
    }
}
