//! Message texts and keyboards.
//!
//! Every text is Bot API HTML. Values that come from users or the store are escaped here.

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;

use crate::bot::menu::MenuAction;
use crate::model::BroadcastModel;
use crate::model::ReferrerEntry;
use crate::model::SubscriberModel;
use crate::model::SubscriberStats;
use crate::service::broadcast_service::BroadcastContent;
use crate::service::broadcast_service::BroadcastReport;
use crate::source::OutageSample;
use crate::transport::InlineButton;
use crate::transport::InlineKeyboard;
use crate::transport::escape_html;
use crate::util::format_local;
use crate::util::offset_label;

pub const WELCOME_TEXT: &str = "👋 Welcome! You are now subscribed to outage alerts.\n\n\
    You will get a message as soon as a monitored service starts failing and another one when \
    it recovers.\n\nUse /command to see everything the bot can do.";

pub const ADMINS_TEXT: &str = "👮 Questions, ideas or an outage we missed? \
    Write to the administrators of the channel.";

pub const HELP_TEXT: &str = "📋 Commands:\n\
    /start - subscribe to outage alerts\n\
    /fail - live report counts of a service\n\
    /last - today's incidents\n\
    /ref - your referral link\n\
    /refstats - top referrers\n\
    /me - your profile\n\
    /admins - contact the administrators";

pub const BROADCAST_USAGE_TEXT: &str = "📢 Reply to a message with /broadcast to send it to \
    every subscriber, or just send the message to broadcast now.";

pub const BROADCAST_CANCELLED_TEXT: &str = "❎ Broadcast cancelled.";

pub const NO_PENDING_BROADCAST_TEXT: &str = "Nothing to broadcast. Start again with /broadcast.";

pub const TRY_AGAIN_TEXT: &str = "⚠️ Something went wrong, please try again later.";

const TOP_REFERRERS_EMPTY_TEXT: &str = "Referral statistics are empty so far.";
const SERVICES_PROMPT_TEXT: &str = "Choose a service:";
const ADMIN_PANEL_TEXT: &str = "🔧 Admin panel:";

/// `telegram` -> `Telegram`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn referral_link(bot_username: &str, user_id: i64) -> String {
    format!("https://t.me/{bot_username}?start={user_id}")
}

pub fn referral_text(link: &str, count: i64, rank: Option<usize>) -> String {
    let rank = rank.map_or_else(|| "-".to_string(), |rank| rank.to_string());
    format!(
        "✔️ <a href=\"{}\">Your referral link</a> for inviting people to the bot.\n\n\
         🎯 Invited: {count}\n\
         🥇 Your place among referrers: {rank}",
        escape_html(link)
    )
}

pub fn referral_keyboard(link: &str) -> InlineKeyboard {
    InlineKeyboard::new().row(vec![InlineButton::url("🔗 Share link", link)])
}

pub fn top_referrers_text(entries: &[ReferrerEntry]) -> String {
    if entries.is_empty() {
        return TOP_REFERRERS_EMPTY_TEXT.to_string();
    }
    let lines: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{}. {} - {} invited",
                i + 1,
                escape_html(&entry.display_name()),
                entry.count
            )
        })
        .collect();
    format!(
        "🏆 Top {} referrers:\n\n{}",
        entries.len(),
        lines.join("\n")
    )
}

pub fn stats_text(stats: &SubscriberStats) -> String {
    format!(
        "📊 Statistics:\n\
         📈 Total users: {}\n\
         🔒 Blocked the bot: {}\n\
         🆕 New today: {}\n\
         🆕 New this week: {}\n\
         🆕 New this month: {}",
        stats.total, stats.blocked, stats.new_today, stats.new_this_week, stats.new_this_month
    )
}

fn broadcast_entry(broadcast: &BroadcastModel, offset: FixedOffset) -> String {
    format!(
        "🕒 {} ({}):\n{}",
        format_local(broadcast.created_at, offset),
        offset_label(offset),
        escape_html(&broadcast.text)
    )
}

/// Today's incidents, or a note that there were none as of `now`.
pub fn last_text(broadcasts: &[BroadcastModel], offset: FixedOffset, now: DateTime<Utc>) -> String {
    if broadcasts.is_empty() {
        return format!(
            "No outages recorded today.\nUpdated: {} ({})",
            format_local(now, offset),
            offset_label(offset)
        );
    }
    let entries: Vec<String> = broadcasts
        .iter()
        .map(|broadcast| broadcast_entry(broadcast, offset))
        .collect();
    format!("📰 Latest messages:\n\n{}", entries.join("\n\n"))
}

pub fn last_message_text(broadcast: Option<&BroadcastModel>, offset: FixedOffset) -> String {
    match broadcast {
        Some(broadcast) => broadcast_entry(broadcast, offset),
        None => "No broadcasts yet.".to_string(),
    }
}

pub fn profile_text(subscriber: &SubscriberModel, referrals: i64, offset: FixedOffset) -> String {
    format!(
        "👤 Profile\n\
         Name: {}\n\
         ID: <code>{}</code>\n\
         Joined: {} ({})\n\
         Invited: {referrals}",
        escape_html(&subscriber.display_name()),
        subscriber.id,
        format_local(subscriber.joined_at, offset),
        offset_label(offset)
    )
}

pub fn services_prompt() -> &'static str {
    SERVICES_PROMPT_TEXT
}

pub fn services_keyboard(names: &[String]) -> InlineKeyboard {
    let buttons = names
        .iter()
        .map(|name| {
            InlineButton::callback(
                capitalize(name),
                MenuAction::ServiceStatus {
                    service: name.clone(),
                }
                .callback_data(),
            )
        })
        .collect();
    InlineKeyboard::grid(buttons, 2)
}

pub fn service_status_caption(service: &str, sample: &OutageSample) -> String {
    format!(
        "⚠️ {} status\n\
         ❗ Reports in the last hour: {}\n\
         ❕ Reports in the last day: {}",
        escape_html(&capitalize(service)),
        sample.hourly_count,
        sample.daily_count
    )
}

pub fn back_to_services_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![InlineButton::callback(
        "⬅️ Back",
        MenuAction::BackToServices.callback_data(),
    )])
}

pub fn admin_panel_text() -> &'static str {
    ADMIN_PANEL_TEXT
}

pub fn admin_panel_keyboard() -> InlineKeyboard {
    let buttons = [
        ("📊 Statistics", MenuAction::AdminStats),
        ("📨 Last message", MenuAction::AdminLastMessage),
        ("📢 Broadcast", MenuAction::AdminBroadcast),
        ("👥 Top referrers", MenuAction::AdminRefStats),
    ]
    .into_iter()
    .map(|(text, action)| InlineButton::callback(text, action.callback_data()))
    .collect();
    InlineKeyboard::grid(buttons, 2)
}

pub fn back_to_admin_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![InlineButton::callback(
        "⬅️ Back",
        MenuAction::BackToAdmin.callback_data(),
    )])
}

pub fn broadcast_preview_text(content: &BroadcastContent) -> String {
    let body = match content {
        BroadcastContent::Text(text) => escape_html(text),
        BroadcastContent::Media { kind, caption, .. } => format!(
            "[{}] {}",
            kind.field(),
            escape_html(caption.as_deref().unwrap_or_default())
        ),
    };
    format!("📢 Send this to every subscriber?\n\n{body}")
}

pub fn broadcast_confirm_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![
        InlineButton::callback("✅ Send", MenuAction::ConfirmBroadcast.callback_data()),
        InlineButton::callback("❌ Cancel", MenuAction::CancelBroadcast.callback_data()),
    ])
}

pub fn broadcast_report_text(report: &BroadcastReport) -> String {
    format!(
        "✅ Broadcast finished.\n\
         Delivered: {}\n\
         Blocked: {}\n\
         Errors: {}\n\
         Total: {}",
        report.delivered, report.blocked, report.errors, report.total
    )
}

pub fn error_text(ref_id: &str) -> String {
    format!("{TRY_AGAIN_TEXT}\nReference ID: <code>{}</code>", escape_html(ref_id))
}
