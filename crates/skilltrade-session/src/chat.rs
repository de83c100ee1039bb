use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use skilltrade_types::ChatMessage;
use skilltrade_types::events::SessionEvent;
use skilltrade_types::models::MatchId;

use crate::error::{SessionError, SessionResult};
use crate::poller::{PollHandle, spawn_poll};
use crate::session::Session;

/// Follows the conversation of one match. Messages are only ever shown as
/// the server returned them; sending does not append locally.
pub struct ChatPoller {
    session: Arc<Session>,
    match_id: MatchId,
    messages: Arc<watch::Sender<Option<Vec<ChatMessage>>>>,
    alive: CancellationToken,
}

impl ChatPoller {
    pub fn new(session: Arc<Session>, match_id: MatchId) -> Self {
        Self {
            session,
            match_id,
            messages: Arc::new(watch::channel(None).0),
            alive: CancellationToken::new(),
        }
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Vec<ChatMessage>>> {
        self.messages.subscribe()
    }

    pub fn current(&self) -> Vec<ChatMessage> {
        self.messages.borrow().clone().unwrap_or_default()
    }

    pub async fn refresh(&self) -> SessionResult<Vec<ChatMessage>> {
        let messages = match self.session.api.messages(self.match_id).await {
            Ok(messages) => chronological(messages),
            Err(e) => return Err(self.session.api_error(e).await),
        };
        self.publish(messages.clone());
        Ok(messages)
    }

    pub fn watch(&self, interval: Duration) -> PollHandle {
        let api = self.session.api.clone();
        let events = self.session.events.clone();
        let match_id = self.match_id;

        spawn_poll(
            self.session.clone(),
            format!("chat {}", match_id),
            interval,
            self.alive.child_token(),
            self.messages.clone(),
            move || {
                let api = api.clone();
                async move { api.messages(match_id).await.map(chronological) }
            },
            move |messages: &Vec<ChatMessage>| {
                events.emit(SessionEvent::MessagesUpdated {
                    match_id,
                    messages: messages.clone(),
                });
            },
        )
    }

    /// Posts a message and refetches the conversation.
    pub async fn send(&self, text: &str) -> SessionResult<Vec<ChatMessage>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::InvalidInput("message cannot be empty".to_string()));
        }

        if let Err(e) = self.session.api.send_message(self.match_id, text).await {
            return Err(self.session.api_error(e).await);
        }
        info!(match_id = self.match_id, "Message sent");

        self.refresh().await
    }

    pub fn close(&self) {
        self.alive.cancel();
    }

    fn publish(&self, messages: Vec<ChatMessage>) {
        if self.alive.is_cancelled() {
            debug!(match_id = self.match_id, "Chat closed, dropping messages");
            return;
        }
        self.session.events.emit(SessionEvent::MessagesUpdated {
            match_id: self.match_id,
            messages: messages.clone(),
        });
        self.messages.send_replace(Some(messages));
    }
}

impl Drop for ChatPoller {
    fn drop(&mut self) {
        self.alive.cancel();
    }
}

fn chronological(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.chat_id.cmp(&b.chat_id)));
    messages
}
