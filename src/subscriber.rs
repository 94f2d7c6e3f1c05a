//! Reactions to outage events.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use minijinja::Environment;
use minijinja::context;

use crate::config::NotificationTemplates;
use crate::monitor::OutageEvent;
use crate::monitor::status_tracker::OutageTransition;
use crate::service::admin_log::AdminLog;
use crate::service::broadcast_service::BroadcastContent;
use crate::service::broadcast_service::BroadcastService;
use crate::service::error::ServiceError;

#[async_trait::async_trait]
pub trait Subscriber<E>: Send + Sync {
    async fn callback(&self, event: E) -> Result<()>;
}

/// Announces outage transitions to every subscriber.
pub struct OutageNotifier {
    broadcast: Arc<BroadcastService>,
    admin_log: Arc<AdminLog>,
    templates: NotificationTemplates,
}

impl OutageNotifier {
    pub fn new(
        broadcast: Arc<BroadcastService>,
        admin_log: Arc<AdminLog>,
        templates: NotificationTemplates,
    ) -> Self {
        Self {
            broadcast,
            admin_log,
            templates,
        }
    }

    /// Renders the notification text for `event` from the configured templates.
    pub fn render(&self, event: &OutageEvent) -> Result<String, ServiceError> {
        let template = match event.transition {
            OutageTransition::Started => &self.templates.started,
            OutageTransition::Resolved => &self.templates.resolved,
        };
        let env = Environment::new();
        Ok(env.render_str(
            template,
            context! {
                service => &event.service,
                hourly => event.sample.hourly_count,
                daily => event.sample.daily_count,
            },
        )?)
    }
}

#[async_trait::async_trait]
impl Subscriber<OutageEvent> for OutageNotifier {
    async fn callback(&self, event: OutageEvent) -> Result<()> {
        let text = self.render(&event)?;
        info!(
            "Outage {:?} for {}, notifying subscribers.",
            event.transition, event.service
        );

        self.broadcast.record(&text).await?;
        let report = self
            .broadcast
            .fanout(&BroadcastContent::Text(text))
            .await?;

        self.admin_log
            .notify(&format!(
                "Outage notification for {} ({:?}) sent: {report}",
                event.service, event.transition
            ))
            .await;
        Ok(())
    }
}
