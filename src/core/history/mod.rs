//! Conversation persistence.
//!
//! The loop only needs [`HistoryStore`] to record turns. Stores that can also
//! list, load and reorganise conversations implement [`FullHistoryStore`];
//! [`HistoryHandle::probe`] detects that capability once at startup so the
//! richer commands can be gated on it.

pub mod file_store;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{SessionMetadata, WebImage};
use crate::core::error::{ChatError, ErrorKind};
use crate::core::message::{ChatEntry, EntryRole};

pub use file_store::FileHistoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: EntryRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<WebImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StoredMessage {
    pub fn from_entry(entry: &ChatEntry, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            role: entry.role,
            content: entry.content.clone(),
            thoughts: entry.thoughts.clone(),
            images: entry.images.clone(),
            timestamp,
        }
    }

    pub fn to_entry(&self) -> ChatEntry {
        ChatEntry {
            role: self.role,
            content: self.content.clone(),
            thoughts: self.thoughts.clone(),
            images: self.images.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

impl Conversation {
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            model: self.model.clone(),
            favorite: self.favorite,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub model: String,
    pub favorite: bool,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl ConversationSummary {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }
}

#[derive(Debug)]
pub enum HistoryError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    NotFound(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Io { path, source } => {
                write!(f, "history I/O failed at {}: {}", path.display(), source)
            }
            HistoryError::Parse { path, source } => {
                write!(f, "history file {} is corrupt: {}", path.display(), source)
            }
            HistoryError::NotFound(id) => write!(f, "conversation not found: {id}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Io { source, .. } => Some(source),
            HistoryError::Parse { source, .. } => Some(source),
            HistoryError::NotFound(_) => None,
        }
    }
}

impl From<HistoryError> for ChatError {
    fn from(err: HistoryError) -> Self {
        let kind = match err {
            HistoryError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Persistence,
        };
        ChatError::new(kind, err.to_string())
    }
}

/// Minimum persistence surface used to record turns.
pub trait HistoryStore: Send + Sync {
    fn add_message(&self, conversation_id: &str, entry: &ChatEntry) -> Result<(), HistoryError>;

    fn update_metadata(
        &self,
        conversation_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), HistoryError>;

    fn update_title(&self, conversation_id: &str, title: &str) -> Result<(), HistoryError>;

    /// Upgrade to the full surface when the store supports it.
    fn as_full(self: Arc<Self>) -> Option<Arc<dyn FullHistoryStore>> {
        None
    }
}

pub trait FullHistoryStore: HistoryStore {
    /// Summaries in display order, favorites first.
    fn list_conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError>;

    fn get_conversation(&self, id: &str) -> Result<Conversation, HistoryError>;

    fn create_conversation(&self, model: &str) -> Result<Conversation, HistoryError>;

    fn delete_conversation(&self, id: &str) -> Result<(), HistoryError>;

    /// Returns the new favorite state.
    fn toggle_favorite(&self, id: &str) -> Result<bool, HistoryError>;

    fn export_to_markdown(&self, id: &str) -> Result<String, HistoryError>;

    fn export_to_json(&self, id: &str) -> Result<String, HistoryError>;

    /// Swap two entries in the stored order. Listing still groups favorites
    /// first, so swapping across the groups has no visible effect.
    fn swap_conversations(&self, first: &str, second: &str) -> Result<(), HistoryError>;
}

/// A history store with its capability level resolved.
#[derive(Clone)]
pub enum HistoryHandle {
    Minimal(Arc<dyn HistoryStore>),
    Full(Arc<dyn FullHistoryStore>),
}

impl HistoryHandle {
    pub fn probe(store: Arc<dyn HistoryStore>) -> Self {
        match Arc::clone(&store).as_full() {
            Some(full) => HistoryHandle::Full(full),
            None => HistoryHandle::Minimal(store),
        }
    }

    pub fn full(&self) -> Option<&Arc<dyn FullHistoryStore>> {
        match self {
            HistoryHandle::Full(store) => Some(store),
            HistoryHandle::Minimal(_) => None,
        }
    }

    pub fn add_message(&self, conversation_id: &str, entry: &ChatEntry) -> Result<(), HistoryError> {
        match self {
            HistoryHandle::Minimal(store) => store.add_message(conversation_id, entry),
            HistoryHandle::Full(store) => store.add_message(conversation_id, entry),
        }
    }

    pub fn update_metadata(
        &self,
        conversation_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), HistoryError> {
        match self {
            HistoryHandle::Minimal(store) => store.update_metadata(conversation_id, metadata),
            HistoryHandle::Full(store) => store.update_metadata(conversation_id, metadata),
        }
    }

    pub fn update_title(&self, conversation_id: &str, title: &str) -> Result<(), HistoryError> {
        match self {
            HistoryHandle::Minimal(store) => store.update_title(conversation_id, title),
            HistoryHandle::Full(store) => store.update_title(conversation_id, title),
        }
    }
}

impl fmt::Debug for HistoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryHandle::Minimal(_) => f.write_str("HistoryHandle::Minimal"),
            HistoryHandle::Full(_) => f.write_str("HistoryHandle::Full"),
        }
    }
}
