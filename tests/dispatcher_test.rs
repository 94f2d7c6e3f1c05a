use std::path::PathBuf;
use std::sync::Arc;

use outage_bot::bot::Data;
use outage_bot::bot::conversation::ConversationState;
use outage_bot::bot::dispatcher::Dispatcher;
use outage_bot::bot::menu::MenuAction;
use outage_bot::repository::Repository;
use outage_bot::repository::table::Table;
use outage_bot::service::Services;
use outage_bot::transport::types::Update;
use serde_json::Value;
use serde_json::json;

mod common;

use common::MockTransport;
use common::SequenceSource;
use common::Sent;

const ADMIN: i64 = 1;
const ADMIN_LOG: i64 = 1000;

struct Harness {
    db: Arc<Repository>,
    db_path: PathBuf,
    transport: Arc<MockTransport>,
    source: Arc<SequenceSource>,
    dispatcher: Dispatcher,
}

async fn harness() -> Harness {
    let (db, db_path) = common::setup_db().await;
    let config = Arc::new(common::test_config());
    let transport = MockTransport::new();
    let source = SequenceSource::new();
    let services = Arc::new(Services::new(
        &config,
        db.clone(),
        transport.clone(),
        source.clone(),
    ));
    let data = Arc::new(Data {
        config,
        services,
        bot_username: "outage_bot".to_string(),
    });
    let dispatcher = Dispatcher::new(data, transport.clone());

    Harness {
        db,
        db_path,
        transport,
        source,
        dispatcher,
    }
}

fn user(id: i64, first_name: &str) -> Value {
    json!({ "id": id, "is_bot": false, "first_name": first_name })
}

fn text_update(from: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": 1,
        "message": {
            "message_id": 50,
            "from": user(from, "User"),
            "chat": { "id": from, "type": "private" },
            "text": text,
        }
    }))
    .unwrap()
}

fn message_update(from: i64, message: Value) -> Update {
    let mut message = message;
    message["message_id"] = json!(51);
    message["from"] = user(from, "User");
    message["chat"] = json!({ "id": from, "type": "private" });
    serde_json::from_value(json!({ "update_id": 2, "message": message })).unwrap()
}

fn callback_update(from: i64, action: &MenuAction) -> Update {
    serde_json::from_value(json!({
        "update_id": 3,
        "callback_query": {
            "id": "cb-1",
            "from": user(from, "User"),
            "data": action.callback_data(),
            "message": {
                "message_id": 60,
                "chat": { "id": from, "type": "private" },
                "text": "menu",
            }
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_start_registers_with_referrer_and_logs_referral() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/start")).await;
    h.dispatcher
        .handle_update(text_update(200, "/start 100"))
        .await;
    // A second /start changes nothing
    h.dispatcher
        .handle_update(text_update(200, "/start 100"))
        .await;

    let referred = h.db.subscriber.select(&200).await.unwrap().unwrap();
    assert_eq!(referred.referrer_id, Some(100));
    assert_eq!(referred.name.as_deref(), Some("User"));
    assert_eq!(h.db.subscriber.select_all().await.unwrap().len(), 2);

    assert_eq!(h.transport.sent_to(200).len(), 2);
    let log = h.transport.sent_to(ADMIN_LOG);
    assert_eq!(log.len(), 1);
    assert!(log[0].text().unwrap().contains("ID 100"));

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_start_ignores_invalid_payload() {
    let h = harness().await;
    h.dispatcher
        .handle_update(text_update(300, "/start promo"))
        .await;

    let sub = h.db.subscriber.select(&300).await.unwrap().unwrap();
    assert_eq!(sub.referrer_id, None);
    assert!(h.transport.sent_to(ADMIN_LOG).is_empty());

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_ref_shows_link_count_and_rank() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/start")).await;
    h.dispatcher
        .handle_update(text_update(200, "/start 100"))
        .await;
    h.transport.clear();

    h.dispatcher.handle_update(text_update(100, "/ref")).await;

    let sent = h.transport.sent_to(100);
    let Sent::Text { text, keyboard, .. } = &sent[0] else {
        panic!("expected a text reply");
    };
    assert!(text.contains("https://t.me/outage_bot?start=100"));
    assert!(text.contains("Invited: 1"));
    assert!(text.contains("referrers: 1"));
    let button = &keyboard.as_ref().unwrap().inline_keyboard[0][0];
    assert_eq!(
        button.url.as_deref(),
        Some("https://t.me/outage_bot?start=100")
    );

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_admin_commands_ignored_for_non_admins() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/stats")).await;
    h.dispatcher.handle_update(text_update(100, "/admin")).await;
    h.dispatcher
        .handle_update(callback_update(100, &MenuAction::AdminStats))
        .await;

    assert!(h.transport.sent().is_empty());

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_stats_for_admin() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/start")).await;
    h.transport.clear();

    h.dispatcher.handle_update(text_update(ADMIN, "/stats")).await;

    let sent = h.transport.sent_to(ADMIN);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text().unwrap().contains("Total users: 1"));

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_broadcast_as_reply() {
    let h = harness().await;
    for id in [100, 200, 300] {
        h.dispatcher.handle_update(text_update(id, "/start")).await;
    }
    h.transport.set_unreachable(200);
    h.transport.clear();

    h.dispatcher
        .handle_update(message_update(
            ADMIN,
            json!({
                "text": "/broadcast",
                "reply_to_message": {
                    "message_id": 49,
                    "chat": { "id": ADMIN, "type": "private" },
                    "text": "Telegram is down <again>",
                }
            }),
        ))
        .await;

    let to_100 = h.transport.sent_to(100);
    assert_eq!(to_100.len(), 1);
    assert_eq!(to_100[0].text(), Some("Telegram is down &lt;again&gt;"));
    assert!(h.db.subscriber.select(&200).await.unwrap().unwrap().is_blocked);

    let report = h.transport.sent_to(ADMIN);
    assert!(report[0].text().unwrap().contains("Delivered: 2"));
    assert!(report[0].text().unwrap().contains("Blocked: 1"));

    // Recorded for /last
    h.dispatcher.handle_update(text_update(100, "/last")).await;
    let last = h.transport.sent_to(100);
    assert!(last[1].text().unwrap().contains("Telegram is down &lt;again&gt;"));

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_broadcast_conversation_with_confirmation() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/start")).await;
    h.transport.clear();

    h.dispatcher
        .handle_update(text_update(ADMIN, "/broadcast"))
        .await;
    assert_eq!(
        h.dispatcher.conversations().get(ADMIN).await,
        Some(ConversationState::AwaitingContent)
    );

    h.dispatcher
        .handle_update(message_update(
            ADMIN,
            json!({
                "caption": "Outage map",
                "photo": [
                    { "file_id": "small", "width": 90, "height": 90 },
                    { "file_id": "large", "width": 900, "height": 900 }
                ]
            }),
        ))
        .await;
    assert!(matches!(
        h.dispatcher.conversations().get(ADMIN).await,
        Some(ConversationState::PendingConfirmation(_))
    ));
    assert!(h.transport.sent_to(100).is_empty());

    h.dispatcher
        .handle_update(callback_update(ADMIN, &MenuAction::ConfirmBroadcast))
        .await;

    let to_100 = h.transport.sent_to(100);
    assert_eq!(to_100.len(), 1);
    assert!(matches!(
        &to_100[0],
        Sent::Media { file_id, caption, .. }
            if file_id == "large" && caption.as_deref() == Some("Outage map")
    ));
    assert_eq!(h.dispatcher.conversations().get(ADMIN).await, None);

    // Confirming again has nothing left to send
    h.dispatcher
        .handle_update(callback_update(ADMIN, &MenuAction::ConfirmBroadcast))
        .await;
    assert_eq!(h.transport.sent_to(100).len(), 1);

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_cancel_broadcast() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/start")).await;
    h.dispatcher
        .handle_update(text_update(ADMIN, "/broadcast"))
        .await;
    h.dispatcher
        .handle_update(text_update(ADMIN, "never sent"))
        .await;
    h.dispatcher
        .handle_update(callback_update(ADMIN, &MenuAction::CancelBroadcast))
        .await;

    assert_eq!(h.dispatcher.conversations().get(ADMIN).await, None);
    assert_eq!(h.transport.sent_to(100).len(), 1);
    assert!(h.db.broadcast.select_all().await.unwrap().is_empty());

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_plain_text_from_users_is_ignored() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "hello")).await;
    assert!(h.transport.sent().is_empty());

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_me_refreshes_name() {
    let h = harness().await;
    h.dispatcher.handle_update(text_update(100, "/start")).await;
    h.db.subscriber.update_name(100, Some("Old")).await.unwrap();

    h.dispatcher.handle_update(text_update(100, "/me")).await;

    let sub = h.db.subscriber.select(&100).await.unwrap().unwrap();
    assert_eq!(sub.name.as_deref(), Some("User"));
    let sent = h.transport.sent_to(100);
    assert!(sent.last().unwrap().text().unwrap().contains("Name: User"));

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_admin_panel_edits_in_place() {
    let h = harness().await;
    h.dispatcher
        .handle_update(callback_update(ADMIN, &MenuAction::AdminRefStats))
        .await;

    let sent = h.transport.sent_to(ADMIN);
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        &sent[0],
        Sent::Edit { message_id: 60, text, .. } if text.contains("empty")
    ));

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_service_status_from_menu() {
    let h = harness().await;
    h.source.push("https://status.test/telegram", &[57]);

    h.dispatcher.handle_update(text_update(100, "/fail")).await;
    let Sent::Text { keyboard, .. } = &h.transport.sent_to(100)[0] else {
        panic!("expected the service list");
    };
    let buttons: Vec<_> = keyboard.as_ref().unwrap().inline_keyboard.concat();
    assert_eq!(buttons[0].text, "Telegram");
    assert_eq!(buttons[1].text, "Youtube");

    h.dispatcher
        .handle_update(callback_update(
            100,
            &MenuAction::ServiceStatus {
                service: "telegram".to_string(),
            },
        ))
        .await;

    // Either the chart or, when it can't be drawn, the plain caption is sent
    let reply = h.transport.sent_to(100).pop().unwrap();
    let text = reply.text().unwrap();
    assert!(text.contains("Reports in the last hour: 57"));
    assert!(text.contains("Reports in the last day: 570"));

    common::teardown_db(h.db_path).await;
}

#[tokio::test]
async fn test_store_failure_asks_to_try_again() {
    let h = harness().await;
    h.db.drop_all_tables().await.unwrap();

    h.dispatcher.handle_update(text_update(100, "/start")).await;

    let sent = h.transport.sent_to(100);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text().unwrap().contains("please try again"));

    common::teardown_db(h.db_path).await;
}
