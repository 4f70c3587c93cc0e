//! In-memory chat sessions.
//!
//! A session binds one agent to an ordered history. The history lock is held for a whole
//! reply round, so concurrent messages to the same session are answered one after another
//! and the history only changes when a round succeeds.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::agent::{Agent, Reply};
use crate::context::RequestContext;
use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::models::role::Role;

/// One history entry: user text, assistant text or a structured reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Value,
}

impl ChatMessage {
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            content: Value::String(text.into()),
        }
    }

    pub fn assistant(reply: &Reply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.to_value(),
        }
    }

    fn to_message(&self) -> Option<Message> {
        let text = match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        if text.is_empty() {
            return None;
        }
        let message = match self.role {
            Role::User => Message::user(),
            Role::Assistant => Message::assistant(),
        };
        Some(message.with_text(text))
    }
}

/// Replay a chat history as model messages
pub fn history_to_messages(history: &[ChatMessage]) -> Vec<Message> {
    history.iter().filter_map(ChatMessage::to_message).collect()
}

pub struct Session {
    id: String,
    agent: Agent,
    history: Mutex<Vec<ChatMessage>>,
}

impl Session {
    pub fn new(agent: Agent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    /// Answer `text` in the context of this session and record both sides of the exchange
    pub async fn send(
        &self,
        text: &str,
        ctx: &RequestContext,
        tools_enabled: bool,
    ) -> AgentResult<(Reply, Vec<ChatMessage>)> {
        let mut history = self.history.lock().await;

        let mut pending = history.clone();
        pending.push(ChatMessage::user(text));
        let messages = history_to_messages(&pending);

        let result = self.agent.reply(&messages, ctx, tools_enabled).await?;
        pending.push(ChatMessage::assistant(&result.reply));
        *history = pending;

        tracing::debug!(session_id = %self.id, entries = history.len(), "session updated");
        Ok((result.reply, history.clone()))
    }
}

/// Live sessions keyed by id
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, agent: Agent) -> Arc<Session> {
        let session = Arc::new(Session::new(agent));
        self.sessions
            .write()
            .await
            .insert(session.id().to_string(), session.clone());
        tracing::info!(session_id = %session.id(), "session started");
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Returns false when no session had that id
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
