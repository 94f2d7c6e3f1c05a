//! Per-administrator broadcast conversations.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::service::broadcast_service::BroadcastContent;

#[derive(Clone, Debug, PartialEq)]
pub enum ConversationState {
    /// The admin's next message becomes the broadcast content.
    AwaitingContent,
    /// Content was received and waits for Confirm or Cancel.
    PendingConfirmation(BroadcastContent),
}

/// Conversation state keyed by administrator id.
#[derive(Default)]
pub struct Conversations {
    states: Mutex<HashMap<i64, ConversationState>>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, admin_id: i64) -> Option<ConversationState> {
        self.states.lock().await.get(&admin_id).cloned()
    }

    pub async fn set(&self, admin_id: i64, state: ConversationState) {
        self.states.lock().await.insert(admin_id, state);
    }

    pub async fn clear(&self, admin_id: i64) -> Option<ConversationState> {
        self.states.lock().await.remove(&admin_id)
    }

    /// Takes the pending content of `admin_id`, leaving no conversation behind.
    pub async fn take_pending(&self, admin_id: i64) -> Option<BroadcastContent> {
        let mut states = self.states.lock().await;
        match states.remove(&admin_id) {
            Some(ConversationState::PendingConfirmation(content)) => Some(content),
            Some(other) => {
                states.insert(admin_id, other);
                None
            }
            None => None,
        }
    }
}
