//! Business logic over the subscriber store, the chat transport and the outage source.

use std::sync::Arc;

use crate::config::Config;
use crate::repository::Repository;
use crate::service::admin_log::AdminLog;
use crate::service::broadcast_service::BroadcastService;
use crate::service::outage_service::OutageService;
use crate::service::subscriber_service::SubscriberService;
use crate::source::OutageSource;
use crate::transport::ChatTransport;
use crate::util::display_offset;

pub mod admin_log;
pub mod broadcast_service;
pub mod error;
pub mod outage_service;
pub mod subscriber_service;

/// Container for all application services.
pub struct Services {
    pub subscriber: Arc<SubscriberService>,
    pub broadcast: Arc<BroadcastService>,
    pub outage: Arc<OutageService>,
    pub admin_log: Arc<AdminLog>,
}

impl Services {
    pub fn new(
        config: &Config,
        db: Arc<Repository>,
        transport: Arc<dyn ChatTransport>,
        source: Arc<dyn OutageSource>,
    ) -> Self {
        let offset = display_offset(config.display_utc_offset_hours);

        Self {
            subscriber: Arc::new(SubscriberService::new(db.clone(), offset)),
            broadcast: Arc::new(BroadcastService::new(db.clone(), transport.clone(), offset)),
            outage: Arc::new(OutageService::new(
                db,
                source,
                config.failure_threshold,
                &config.monitored_services,
                config.persist_outage_state,
            )),
            admin_log: Arc::new(AdminLog::new(transport, config.admin_log_chat_id)),
        }
    }
}
