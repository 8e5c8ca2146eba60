use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{
    Conversation, ConversationSummary, FullHistoryStore, HistoryError, HistoryStore,
    StoredMessage,
};
use crate::api::SessionMetadata;
use crate::core::export::{render_json, render_markdown};
use crate::core::message::ChatEntry;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryIndex {
    #[serde(default)]
    order: Vec<String>,
}

/// One JSON file per conversation plus an `index.json` holding display order.
pub struct FileHistoryStore {
    dir: PathBuf,
    // Serialises read-modify-write cycles on the index and conversation files.
    lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| HistoryError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_index(&self) -> Result<HistoryIndex, HistoryError> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(HistoryIndex::default());
        }
        read_json(&path)
    }

    fn write_index(&self, index: &HistoryIndex) -> Result<(), HistoryError> {
        write_json(&self.dir.join(INDEX_FILE), index)
    }

    fn load(&self, id: &str) -> Result<Conversation, HistoryError> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Err(HistoryError::NotFound(id.to_string()));
        }
        read_json(&path)
    }

    fn save(&self, conversation: &Conversation) -> Result<(), HistoryError> {
        write_json(&self.conversation_path(&conversation.id), conversation)
    }

    fn modify<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Conversation) -> T,
    ) -> Result<T, HistoryError> {
        let _guard = self.guard();
        let mut conversation = self.load(id)?;
        let result = f(&mut conversation);
        self.save(&conversation)?;
        Ok(result)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, HistoryError> {
    let contents = fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| HistoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HistoryError> {
    let io_err = |source: std::io::Error| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let contents = serde_json::to_string_pretty(value).map_err(|source| HistoryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp_file.write_all(contents.as_bytes()).map_err(io_err)?;
    temp_file.as_file_mut().sync_all().map_err(io_err)?;
    temp_file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

fn new_conversation_id() -> String {
    let mut bytes = [0u8; 4];
    if getrandom::fill(&mut bytes).is_err() {
        bytes = Utc::now().timestamp_subsec_nanos().to_le_bytes();
    }
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-{suffix}", Utc::now().format("%Y%m%d%H%M%S"))
}

impl HistoryStore for FileHistoryStore {
    fn add_message(&self, conversation_id: &str, entry: &ChatEntry) -> Result<(), HistoryError> {
        let now = Utc::now();
        self.modify(conversation_id, |conversation| {
            conversation
                .messages
                .push(StoredMessage::from_entry(entry, Some(now)));
            conversation.updated_at = now;
        })
    }

    fn update_metadata(
        &self,
        conversation_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), HistoryError> {
        self.modify(conversation_id, |conversation| {
            conversation.metadata = metadata.clone();
        })
    }

    fn update_title(&self, conversation_id: &str, title: &str) -> Result<(), HistoryError> {
        self.modify(conversation_id, |conversation| {
            conversation.title = title.to_string();
        })
    }

    fn as_full(self: Arc<Self>) -> Option<Arc<dyn FullHistoryStore>> {
        Some(self)
    }
}

impl FullHistoryStore for FileHistoryStore {
    fn list_conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError> {
        let _guard = self.guard();
        let index = self.read_index()?;
        let mut summaries = Vec::with_capacity(index.order.len());
        for id in &index.order {
            match self.load(id) {
                Ok(conversation) => summaries.push(conversation.summary()),
                Err(HistoryError::NotFound(_)) => {
                    debug!(conversation_id = %id, "Skipping indexed conversation with no file");
                }
                Err(err) => return Err(err),
            }
        }
        summaries.sort_by_key(|summary| !summary.favorite);
        Ok(summaries)
    }

    fn get_conversation(&self, id: &str) -> Result<Conversation, HistoryError> {
        let _guard = self.guard();
        self.load(id)
    }

    fn create_conversation(&self, model: &str) -> Result<Conversation, HistoryError> {
        let _guard = self.guard();
        let now = Utc::now();
        let conversation = Conversation {
            id: new_conversation_id(),
            title: String::new(),
            model: model.to_string(),
            favorite: false,
            created_at: now,
            updated_at: now,
            metadata: SessionMetadata::default(),
            messages: Vec::new(),
        };
        self.save(&conversation)?;

        let mut index = self.read_index()?;
        index.order.insert(0, conversation.id.clone());
        self.write_index(&index)?;
        debug!(conversation_id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    fn delete_conversation(&self, id: &str) -> Result<(), HistoryError> {
        let _guard = self.guard();
        let path = self.conversation_path(id);
        if !path.exists() {
            return Err(HistoryError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|source| HistoryError::Io { path, source })?;

        let mut index = self.read_index()?;
        index.order.retain(|existing| existing != id);
        self.write_index(&index)
    }

    fn toggle_favorite(&self, id: &str) -> Result<bool, HistoryError> {
        self.modify(id, |conversation| {
            conversation.favorite = !conversation.favorite;
            conversation.favorite
        })
    }

    fn export_to_markdown(&self, id: &str) -> Result<String, HistoryError> {
        let conversation = self.get_conversation(id)?;
        Ok(render_markdown(&conversation.title, &conversation.messages))
    }

    fn export_to_json(&self, id: &str) -> Result<String, HistoryError> {
        let conversation = self.get_conversation(id)?;
        render_json(&conversation.title, &conversation.messages).map_err(|source| {
            HistoryError::Parse {
                path: self.conversation_path(id),
                source,
            }
        })
    }

    fn swap_conversations(&self, first: &str, second: &str) -> Result<(), HistoryError> {
        let _guard = self.guard();
        let mut index = self.read_index()?;
        let position = |id: &str| {
            index
                .order
                .iter()
                .position(|existing| existing == id)
                .ok_or_else(|| HistoryError::NotFound(id.to_string()))
        };
        let a = position(first)?;
        let b = position(second)?;
        index.order.swap(a, b);
        self.write_index(&index)
    }
}
