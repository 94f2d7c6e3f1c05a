//! Common test utilities and mock implementations.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use outage_bot::config::Config;
use outage_bot::config::MonitoredServiceConfig;
use outage_bot::repository::Repository;
use outage_bot::source::OutageSample;
use outage_bot::source::OutageSource;
use outage_bot::transport::ChatTransport;
use outage_bot::transport::InlineKeyboard;
use outage_bot::transport::MediaKind;
use outage_bot::transport::error::TransportError;
use uuid::Uuid;

/// Sets up a temporary test database.
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("outage-bot-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

/// Cleans up the test database file.
pub async fn teardown_db(db_path: PathBuf) {
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

/// Config with a single admin (id 1) and two services on fake urls.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        bot_token: "test-token".to_string(),
        bot_username: Some("outage_bot".to_string()),
        admin_ids: vec![1],
        admin_log_chat_id: Some(1000),
        failure_threshold: 40,
        monitored_services: vec![
            MonitoredServiceConfig {
                name: "telegram".to_string(),
                url: "https://status.test/telegram".to_string(),
            },
            MonitoredServiceConfig {
                name: "youtube".to_string(),
                url: "https://status.test/youtube".to_string(),
            },
        ],
        ..Config::default()
    }
}

// MOCK TRANSPORT

/// One outbound call recorded by [`MockTransport`].
#[derive(Clone, Debug, PartialEq)]
#[allow(dead_code)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Media {
        chat_id: i64,
        kind: MediaKind,
        file_id: String,
        caption: Option<String>,
    },
    Png {
        chat_id: i64,
        caption: String,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
}

#[allow(dead_code)]
impl Sent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Sent::Text { chat_id, .. }
            | Sent::Media { chat_id, .. }
            | Sent::Png { chat_id, .. }
            | Sent::Edit { chat_id, .. } => *chat_id,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Text { text, .. } | Sent::Edit { text, .. } => Some(text.as_str()),
            Sent::Png { caption, .. } => Some(caption.as_str()),
            Sent::Media { caption, .. } => caption.as_deref(),
        }
    }
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockTransportState {
    /// Successful sends, in order.
    pub sent: Vec<Sent>,
    /// Every chat a send was attempted to, in order.
    pub attempted: Vec<i64>,
    pub unreachable: HashSet<i64>,
    pub failing: HashSet<i64>,
}

/// In-memory transport. Sends to `unreachable` chats fail as unreachable, sends to `failing`
/// chats fail with a transient API error.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockTransport {
    pub state: Mutex<MockTransportState>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_unreachable(&self, chat_id: i64) {
        self.state.lock().unwrap().unreachable.insert(chat_id);
    }

    pub fn set_failing(&self, chat_id: i64) {
        self.state.lock().unwrap().failing.insert(chat_id);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|sent| sent.chat_id() == chat_id)
            .collect()
    }

    pub fn attempted(&self) -> Vec<i64> {
        self.state.lock().unwrap().attempted.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.sent.clear();
        state.attempted.clear();
    }

    fn record(&self, chat_id: i64, sent: Sent) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.attempted.push(chat_id);
        if state.unreachable.contains(&chat_id) {
            return Err(TransportError::Unreachable {
                chat_id,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        if state.failing.contains(&chat_id) {
            return Err(TransportError::Api {
                code: 429,
                description: "Too Many Requests: retry after 1".to_string(),
            });
        }
        state.sent.push(sent);
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        self.record(
            chat_id,
            Sent::Text {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            },
        )
    }

    async fn send_media(
        &self,
        chat_id: i64,
        kind: MediaKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        self.record(
            chat_id,
            Sent::Media {
                chat_id,
                kind,
                file_id: file_id.to_string(),
                caption: caption.map(str::to_string),
            },
        )
    }

    async fn send_png(
        &self,
        chat_id: i64,
        _png: Vec<u8>,
        caption: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        self.record(
            chat_id,
            Sent::Png {
                chat_id,
                caption: caption.to_string(),
            },
        )
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        self.record(
            chat_id,
            Sent::Edit {
                chat_id,
                message_id,
                text: text.to_string(),
            },
        )
    }

    async fn answer_callback(&self, _callback_id: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

// MOCK SOURCE

/// Source that replays queued hourly counts per url, then returns empty samples.
#[derive(Default)]
#[allow(dead_code)]
pub struct SequenceSource {
    pub samples: Mutex<HashMap<String, VecDeque<u32>>>,
}

#[allow(dead_code)]
impl SequenceSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, url: &str, hourly_counts: &[u32]) {
        self.samples
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(hourly_counts.iter().copied());
    }
}

#[async_trait]
impl OutageSource for SequenceSource {
    async fn fetch_sample(&self, url: &str) -> OutageSample {
        let next = self
            .samples
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        match next {
            Some(hourly_count) => OutageSample {
                hourly_count,
                daily_count: hourly_count * 10,
                series: vec![hourly_count / 2, hourly_count],
            },
            None => OutageSample::empty(),
        }
    }
}
