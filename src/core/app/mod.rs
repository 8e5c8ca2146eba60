use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ChatSession;
use crate::core::error::ChatError;
use crate::core::history::{FullHistoryStore, HistoryError, HistoryHandle};
use crate::core::message::ChatEntry;
use crate::core::persona::PersonaStore;
use crate::tools::ToolRegistry;
use crate::ui::theme::Theme;

pub mod actions;
pub mod keymap;
pub mod session;
pub mod ui_state;
pub mod view;

pub use actions::{
    apply_action, apply_actions, AppAction, AppActionDispatcher, AppCommand, DownloadOutcome,
    ExportOutcome, ExportRequest, ExportSource, TaskResult,
};
pub use keymap::{KeyBinding, KeyContext, Keymap};
pub use session::{ConversationRef, SessionContext, ToolRoundTrip, MAX_TOOL_CHAIN_DEPTH};
pub use ui_state::{Banner, UiState};
pub use view::ViewState;

/// Maximum characters of the first user line used as a conversation title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Everything needed to build an [`App`].
pub struct AppInit {
    pub chat: Arc<dyn ChatSession>,
    pub history: Option<HistoryHandle>,
    pub tools: Arc<ToolRegistry>,
    pub personas: PersonaStore,
    pub theme: Theme,
    pub markdown: bool,
    pub auto_approve: bool,
    pub download_dir: PathBuf,
}

pub struct App {
    pub session: SessionContext,
    pub ui: UiState,
    pub view: ViewState,
    pub history: Option<HistoryHandle>,
    pub tools: Arc<ToolRegistry>,
    pub personas: PersonaStore,
    pub auto_approve: bool,
    pub keymap: Keymap,
}

impl App {
    pub fn new(init: AppInit) -> Self {
        Self {
            session: SessionContext::new(init.chat, init.download_dir),
            ui: UiState::new(init.theme, init.markdown),
            view: ViewState::Chat,
            history: init.history,
            tools: init.tools,
            personas: init.personas,
            auto_approve: init.auto_approve,
            keymap: Keymap::standard(),
        }
    }

    pub fn full_history(&self) -> Option<Arc<dyn FullHistoryStore>> {
        self.history.as_ref().and_then(|h| h.full().cloned())
    }

    /// Full store or a validation error naming the command that needs it.
    pub fn require_full_history(
        &self,
        command: &str,
    ) -> Result<Arc<dyn FullHistoryStore>, ChatError> {
        self.full_history().ok_or_else(|| {
            ChatError::validation(format!("/{command} requires a persistent history store"))
        })
    }

    pub fn model(&self) -> String {
        self.session.chat.model()
    }

    /// Run a store mutation against the active conversation; failures are logged only.
    pub fn persist<F>(&self, what: &str, op: F)
    where
        F: FnOnce(&HistoryHandle, &str) -> Result<(), HistoryError>,
    {
        let (Some(history), Some(id)) = (&self.history, self.session.conversation_id()) else {
            return;
        };
        match op(history, id) {
            Ok(()) => debug!(conversation_id = %id, what, "Persisted"),
            Err(err) => warn!(conversation_id = %id, what, error = %err, "Persistence failed"),
        }
    }

    /// Append to the log and persist best-effort.
    pub fn push_entry(&mut self, entry: ChatEntry) {
        self.persist("message", |history, id| history.add_message(id, &entry));
        self.session.messages.push(entry);
        self.ui.scroll_to_bottom();
    }

    /// Make sure the turn has a conversation to land in, titled after its first message.
    pub fn ensure_conversation(&mut self, first_message: &str) {
        if self.session.conversation.is_none() {
            let Some(store) = self.full_history() else {
                return;
            };
            match store.create_conversation(&self.model()) {
                Ok(conversation) => {
                    self.session.conversation = Some(ConversationRef {
                        id: conversation.id,
                        title: String::new(),
                    });
                }
                Err(err) => {
                    warn!(error = %err, "Could not create conversation");
                    return;
                }
            }
        }

        if self.session.title().is_some() {
            return;
        }
        let title = title_from_message(first_message);
        if let Some(conversation) = self.session.conversation.as_mut() {
            conversation.title = title.clone();
        }
        self.persist("title", |history, id| history.update_title(id, &title));
    }

    pub fn request_exit(&mut self) {
        self.ui.exit_requested = true;
    }
}

/// First non-empty line, cut to [`TITLE_MAX_CHARS`].
pub fn title_from_message(message: &str) -> String {
    let line = message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= TITLE_MAX_CHARS {
        line.to_string()
    } else {
        let mut title: String = line.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    }
}
