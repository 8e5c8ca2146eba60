use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ChatSession, ModelOutput, UploadedFile, WebImage};
use crate::core::message::ChatEntry;
use crate::tools::ToolCall;

/// Follow-up sends allowed per user turn before tool use is cut off.
pub const MAX_TOOL_CHAIN_DEPTH: usize = 8;

/// The persisted conversation the log is being written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRef {
    pub id: String,
    pub title: String,
}

/// In-flight tool calls for one assistant reply.
#[derive(Debug, Clone, Default)]
pub struct ToolRoundTrip {
    pub queue: VecDeque<ToolCall>,
    pub active: Option<ToolCall>,
    /// Canonical result blocks, in call order.
    pub results: Vec<String>,
    /// Narrative text that accompanied the calls; folded into the first tool entry.
    pub preamble: Option<String>,
    /// Reasoning and images from the same reply, attached to the first tool entry.
    pub thoughts: Option<String>,
    pub images: Vec<WebImage>,
}

impl ToolRoundTrip {
    pub fn new(calls: Vec<ToolCall>, preamble: Option<String>) -> Self {
        Self {
            queue: calls.into(),
            preamble,
            ..Self::default()
        }
    }

    pub fn with_reply_extras(mut self, thoughts: Option<String>, images: Vec<WebImage>) -> Self {
        self.thoughts = thoughts;
        self.images = images;
        self
    }

    /// Entry for a finished call. The first one carries the reply's preamble,
    /// thoughts and images.
    pub fn entry_for(&mut self, summary: String) -> ChatEntry {
        let content = match self.preamble.take() {
            Some(preamble) => format!("{preamble}\n\n{summary}"),
            None => summary,
        };
        let mut entry = ChatEntry::tool(content);
        entry.thoughts = self.thoughts.take();
        entry.images = std::mem::take(&mut self.images);
        entry
    }
}

pub struct SessionContext {
    pub chat: Arc<dyn ChatSession>,
    pub messages: Vec<ChatEntry>,
    pub conversation: Option<ConversationRef>,
    pub attachments: Vec<UploadedFile>,
    pub last_output: Option<ModelOutput>,
    pub active_gem: Option<String>,
    pub download_dir: PathBuf,
    pub round_trip: Option<ToolRoundTrip>,
    pub tool_chain_depth: usize,
    /// Send whose reply drives the current turn; late replies carry other ids.
    pub pending_request: Option<u64>,
    /// Conversation being read from the store. Sends wait until it lands.
    pub pending_load: Option<String>,
    next_request_id: u64,
}

impl SessionContext {
    pub fn new(chat: Arc<dyn ChatSession>, download_dir: PathBuf) -> Self {
        Self {
            chat,
            messages: Vec::new(),
            conversation: None,
            attachments: Vec::new(),
            last_output: None,
            active_gem: None,
            download_dir,
            round_trip: None,
            tool_chain_depth: 0,
            pending_request: None,
            pending_load: None,
            next_request_id: 0,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }

    pub fn begin_request(&mut self) -> u64 {
        self.next_request_id += 1;
        self.pending_request = Some(self.next_request_id);
        self.next_request_id
    }

    pub fn is_pending(&self, request_id: u64) -> bool {
        self.pending_request == Some(request_id)
    }

    pub fn title(&self) -> Option<&str> {
        self.conversation
            .as_ref()
            .map(|c| c.title.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}
