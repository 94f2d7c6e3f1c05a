//! Routes incoming updates to command and menu handlers.

use std::sync::Arc;

use chrono::Utc;
use log::debug;
use log::info;
use log::warn;

use crate::bot::Data;
use crate::bot::Error;
use crate::bot::chart::render_series_chart;
use crate::bot::checks::check_admin;
use crate::bot::commands::Command;
use crate::bot::commands::parse_referrer;
use crate::bot::conversation::ConversationState;
use crate::bot::conversation::Conversations;
use crate::bot::error_handler::ErrorHandler;
use crate::bot::menu::MenuAction;
use crate::bot::views;
use crate::service::broadcast_service::BroadcastContent;
use crate::service::subscriber_service::RegisterResult;
use crate::transport::ChatTransport;
use crate::transport::InlineKeyboard;
use crate::transport::types::CallbackQuery;
use crate::transport::types::Message;
use crate::transport::types::Update;
use crate::transport::types::User;

const TOP_REFERRERS_LIMIT: u32 = 10;
const LAST_BROADCASTS_LIMIT: u32 = 5;

/// Takes the broadcastable part of a message: an attachment with its caption, or its text.
pub fn broadcast_content(message: &Message) -> Option<BroadcastContent> {
    if let Some((kind, file_id)) = message.attachment() {
        return Some(BroadcastContent::Media {
            kind,
            file_id: file_id.to_string(),
            caption: message.caption.clone(),
        });
    }
    message
        .text
        .as_ref()
        .filter(|text| !text.trim().is_empty())
        .map(|text| BroadcastContent::Text(text.clone()))
}

/// Where a menu answer goes: the message holding the pressed keyboard.
struct MenuTarget {
    chat_id: i64,
    message_id: i64,
}

pub struct Dispatcher {
    data: Arc<Data>,
    transport: Arc<dyn ChatTransport>,
    conversations: Conversations,
}

impl Dispatcher {
    pub fn new(data: Arc<Data>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            data,
            transport,
            conversations: Conversations::new(),
        }
    }

    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    /// Handles one update. Errors are reported to the chat the update came from.
    pub async fn handle_update(&self, update: Update) {
        if let Some(message) = update.message {
            if let Err(e) = self.handle_message(&message).await {
                let context = message.text.as_deref().unwrap_or("message");
                ErrorHandler::handle(self.transport.as_ref(), message.chat.id, context, e).await;
            }
        } else if let Some(query) = update.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map_or(query.from.id, |message| message.chat.id);
            if let Err(e) = self.handle_callback(&query).await {
                let context = query.data.as_deref().unwrap_or("callback");
                ErrorHandler::handle(self.transport.as_ref(), chat_id, context, e).await;
            }
        } else {
            debug!("Ignoring update {} without message.", update.update_id);
        }
    }

    async fn handle_message(&self, message: &Message) -> Result<(), Error> {
        let Some(from) = &message.from else {
            return Ok(());
        };

        if let Some(text) = &message.text
            && let Some(command) = Command::parse(text, &self.data.bot_username)
        {
            if command.is_admin_only() {
                check_admin(&self.data.config, from.id)?;
            }
            return self.handle_command(message, from, command).await;
        }

        if self.data.config.is_admin(from.id)
            && self.conversations.get(from.id).await == Some(ConversationState::AwaitingContent)
        {
            return self.receive_broadcast_content(message, from).await;
        }

        Ok(())
    }

    async fn handle_command(
        &self,
        message: &Message,
        from: &User,
        command: Command,
    ) -> Result<(), Error> {
        let chat_id = message.chat.id;
        debug!("Command {command:?} from {}", from.id);

        match command {
            Command::Start { payload } => self.start(chat_id, from, payload.as_deref()).await,
            Command::Stats => {
                let stats = self.data.services.subscriber.stats().await?;
                self.send(chat_id, &views::stats_text(&stats), None).await
            }
            Command::Broadcast => self.broadcast(message, from).await,
            Command::Last => {
                let broadcasts = self
                    .data
                    .services
                    .broadcast
                    .today(LAST_BROADCASTS_LIMIT)
                    .await?;
                let offset = self.data.services.broadcast.display_offset();
                self.send(
                    chat_id,
                    &views::last_text(&broadcasts, offset, Utc::now()),
                    None,
                )
                .await
            }
            Command::Ref => self.referral(chat_id, from).await,
            Command::RefStats => {
                let top = self
                    .data
                    .services
                    .subscriber
                    .top_referrers(TOP_REFERRERS_LIMIT)
                    .await?;
                self.send(chat_id, &views::top_referrers_text(&top), None)
                    .await
            }
            Command::Admins => self.send(chat_id, views::ADMINS_TEXT, None).await,
            Command::Help => self.send(chat_id, views::HELP_TEXT, None).await,
            Command::Me => self.profile(chat_id, from).await,
            Command::Admin => {
                self.send(
                    chat_id,
                    views::admin_panel_text(),
                    Some(&views::admin_panel_keyboard()),
                )
                .await
            }
            Command::Fail => self.send_services(chat_id).await,
        }
    }

    async fn start(&self, chat_id: i64, from: &User, payload: Option<&str>) -> Result<(), Error> {
        let name = from.full_name();
        let result = self
            .data
            .services
            .subscriber
            .register(from.id, name.as_deref(), parse_referrer(payload))
            .await?;

        self.send(chat_id, views::WELCOME_TEXT, None).await?;

        if let RegisterResult::Created { subscriber } = &result {
            info!("Registered subscriber {}", subscriber.id);
            if let Some(referrer_id) = subscriber.referrer_id {
                self.data
                    .services
                    .admin_log
                    .notify(&format!(
                        "👤 New user {} registered through the referral link of ID {referrer_id}",
                        subscriber.display_name()
                    ))
                    .await;
            }
        }
        Ok(())
    }

    async fn referral(&self, chat_id: i64, from: &User) -> Result<(), Error> {
        let subscriber = &self.data.services.subscriber;
        let link = views::referral_link(&self.data.bot_username, from.id);
        let count = subscriber.referral_count(from.id).await?;
        let rank = subscriber.referral_rank(from.id).await?;
        self.send(
            chat_id,
            &views::referral_text(&link, count, rank),
            Some(&views::referral_keyboard(&link)),
        )
        .await
    }

    async fn profile(&self, chat_id: i64, from: &User) -> Result<(), Error> {
        let service = &self.data.services.subscriber;
        let current_name = from.full_name();
        let mut subscriber = service
            .register(from.id, current_name.as_deref(), None)
            .await?
            .subscriber()
            .clone();
        if service
            .refresh_name(&mut subscriber, current_name.as_deref())
            .await?
        {
            info!("Subscriber {} renamed to {:?}", subscriber.id, subscriber.name);
        }

        let referrals = service.referral_count(from.id).await?;
        let offset = self.data.services.broadcast.display_offset();
        self.send(
            chat_id,
            &views::profile_text(&subscriber, referrals, offset),
            None,
        )
        .await
    }

    async fn broadcast(&self, message: &Message, from: &User) -> Result<(), Error> {
        let chat_id = message.chat.id;
        let Some(reply) = &message.reply_to_message else {
            self.conversations
                .set(from.id, ConversationState::AwaitingContent)
                .await;
            return self.send(chat_id, views::BROADCAST_USAGE_TEXT, None).await;
        };

        match broadcast_content(reply) {
            Some(content) => self.run_broadcast(chat_id, from.id, content).await,
            None => {
                self.send(chat_id, views::NO_PENDING_BROADCAST_TEXT, None)
                    .await
            }
        }
    }

    async fn receive_broadcast_content(&self, message: &Message, from: &User) -> Result<(), Error> {
        let chat_id = message.chat.id;
        let Some(content) = broadcast_content(message) else {
            return self.send(chat_id, views::BROADCAST_USAGE_TEXT, None).await;
        };

        let preview = views::broadcast_preview_text(&content);
        self.conversations
            .set(from.id, ConversationState::PendingConfirmation(content))
            .await;
        self.send(
            chat_id,
            &preview,
            Some(&views::broadcast_confirm_keyboard()),
        )
        .await
    }

    /// Records and delivers `content`, then reports the outcome to the admin.
    async fn run_broadcast(
        &self,
        chat_id: i64,
        admin_id: i64,
        content: BroadcastContent,
    ) -> Result<(), Error> {
        let broadcast = &self.data.services.broadcast;
        broadcast.record(&content.record_text()).await?;
        let report = broadcast.fanout(&content).await?;

        self.send(chat_id, &views::broadcast_report_text(&report), None)
            .await?;

        let admin_log = &self.data.services.admin_log;
        admin_log
            .notify(&format!("Broadcast from {admin_id}: {report}"))
            .await;
        if report.errors > 0 {
            admin_log
                .notify(&format!(
                    "{} deliveries failed with transient errors, see logs.",
                    report.errors
                ))
                .await;
        }
        Ok(())
    }

    async fn handle_callback(&self, query: &CallbackQuery) -> Result<(), Error> {
        if let Err(e) = self.transport.answer_callback(&query.id).await {
            warn!("Failed to answer callback {}: {e}", query.id);
        }

        let Some(message) = &query.message else {
            return Ok(());
        };
        let Some(data) = &query.data else {
            return Ok(());
        };
        let action: MenuAction = data.parse()?;
        if action.is_admin_only() {
            check_admin(&self.data.config, query.from.id)?;
        }

        let target = MenuTarget {
            chat_id: message.chat.id,
            message_id: message.message_id,
        };
        self.handle_menu_action(action, &target, &query.from).await
    }

    async fn handle_menu_action(
        &self,
        action: MenuAction,
        target: &MenuTarget,
        from: &User,
    ) -> Result<(), Error> {
        let services = &self.data.services;
        match action {
            MenuAction::ServiceStatus { service } => {
                self.send_service_status(target.chat_id, &service).await
            }
            MenuAction::BackToServices => self.send_services(target.chat_id).await,
            MenuAction::AdminStats => {
                let stats = services.subscriber.stats().await?;
                self.edit_admin(target, &views::stats_text(&stats)).await
            }
            MenuAction::AdminLastMessage => {
                let recent = services.broadcast.recent(1).await?;
                let text =
                    views::last_message_text(recent.first(), services.broadcast.display_offset());
                self.edit_admin(target, &text).await
            }
            MenuAction::AdminBroadcast => {
                self.conversations
                    .set(from.id, ConversationState::AwaitingContent)
                    .await;
                self.edit_admin(target, views::BROADCAST_USAGE_TEXT).await
            }
            MenuAction::AdminRefStats => {
                let top = services
                    .subscriber
                    .top_referrers(TOP_REFERRERS_LIMIT)
                    .await?;
                self.edit_admin(target, &views::top_referrers_text(&top))
                    .await
            }
            MenuAction::BackToAdmin => {
                self.conversations.clear(from.id).await;
                self.edit(
                    target,
                    views::admin_panel_text(),
                    Some(&views::admin_panel_keyboard()),
                )
                .await
            }
            MenuAction::ConfirmBroadcast => match self.conversations.take_pending(from.id).await {
                Some(content) => {
                    self.edit(target, &views::broadcast_preview_text(&content), None)
                        .await?;
                    self.run_broadcast(target.chat_id, from.id, content).await
                }
                None => {
                    self.edit(target, views::NO_PENDING_BROADCAST_TEXT, None)
                        .await
                }
            },
            MenuAction::CancelBroadcast => {
                self.conversations.clear(from.id).await;
                self.edit(target, views::BROADCAST_CANCELLED_TEXT, None)
                    .await
            }
        }
    }

    async fn send_services(&self, chat_id: i64) -> Result<(), Error> {
        let names = self.data.services.outage.service_names().await;
        self.send(
            chat_id,
            views::services_prompt(),
            Some(&views::services_keyboard(&names)),
        )
        .await
    }

    async fn send_service_status(&self, chat_id: i64, service: &str) -> Result<(), Error> {
        let sample = self.data.services.outage.live_sample(service).await?;
        let caption = views::service_status_caption(service, &sample);
        let keyboard = views::back_to_services_keyboard();

        match render_series_chart(service, &sample.series) {
            Ok(png) => {
                self.transport
                    .send_png(chat_id, png, &caption, Some(&keyboard))
                    .await?
            }
            Err(e) => {
                warn!("Failed to draw chart of {service}: {e}");
                self.send(chat_id, &caption, Some(&keyboard)).await?
            }
        }
        Ok(())
    }

    async fn edit_admin(&self, target: &MenuTarget, text: &str) -> Result<(), Error> {
        self.edit(target, text, Some(&views::back_to_admin_keyboard()))
            .await
    }

    async fn edit(
        &self,
        target: &MenuTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), Error> {
        Ok(self
            .transport
            .edit_text(target.chat_id, target.message_id, text, keyboard)
            .await?)
    }

    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), Error> {
        Ok(self.transport.send_text(chat_id, text, keyboard).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MediaKind;
    use crate::transport::types::Chat;
    use crate::transport::types::FileRef;

    fn message(text: Option<&str>) -> Message {
        Message {
            message_id: 1,
            from: None,
            chat: Chat { id: 1 },
            text: text.map(str::to_string),
            caption: None,
            photo: None,
            document: None,
            video: None,
            reply_to_message: None,
        }
    }

    #[test]
    fn test_broadcast_content_prefers_attachment() {
        let mut msg = message(None);
        msg.caption = Some("caption".to_string());
        msg.document = Some(FileRef {
            file_id: "doc".to_string(),
        });
        assert_eq!(
            broadcast_content(&msg),
            Some(BroadcastContent::Media {
                kind: MediaKind::Document,
                file_id: "doc".to_string(),
                caption: Some("caption".to_string()),
            })
        );
    }

    #[test]
    fn test_broadcast_content_text() {
        assert_eq!(
            broadcast_content(&message(Some("hello"))),
            Some(BroadcastContent::Text("hello".to_string()))
        );
        assert_eq!(broadcast_content(&message(Some("  "))), None);
        assert_eq!(broadcast_content(&message(None)), None);
    }
}
