//! Modal views. Exactly one is active at a time.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::api::{Gem, ModelOutput, WebImage};
use crate::core::history::ConversationSummary;
use crate::tools::ToolCall;

/// Maximum rows a picker overlay shows at once.
pub const PICKER_WINDOW: usize = 8;

#[derive(Debug, Clone, Default)]
pub enum ViewState {
    #[default]
    Chat,
    PickGem(PickerState<Gem>),
    PickHistory(PickerState<HistoryChoice>),
    PickImage(ImagePickerState),
    ConfirmTool(ToolConfirmation),
}

impl ViewState {
    pub fn is_chat(&self) -> bool {
        matches!(self, ViewState::Chat)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Chat => "chat",
            ViewState::PickGem(_) => "gems",
            ViewState::PickHistory(_) => "history",
            ViewState::PickImage(_) => "images",
            ViewState::ConfirmTool(_) => "confirm",
        }
    }
}

/// Something a filterable picker can list.
pub trait PickerEntry {
    fn label(&self) -> String;

    fn detail(&self) -> Option<String> {
        None
    }

    /// Entries that ignore the filter stay visible at all times.
    fn pinned(&self) -> bool {
        false
    }

    fn matches(&self, filter: &str) -> bool {
        self.pinned() || self.label().to_lowercase().contains(&filter.to_lowercase())
    }
}

impl PickerEntry for Gem {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> Option<String> {
        let kind = if self.predefined { "system" } else { "custom" };
        if self.description.trim().is_empty() {
            Some(kind.to_string())
        } else {
            Some(format!("{kind} · {}", self.description.trim()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryChoice {
    New,
    Existing(ConversationSummary),
}

impl PickerEntry for HistoryChoice {
    fn label(&self) -> String {
        match self {
            HistoryChoice::New => "+ New Conversation".to_string(),
            HistoryChoice::Existing(summary) => {
                let star = if summary.favorite { "★ " } else { "" };
                format!("{star}{}", summary.display_title())
            }
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            HistoryChoice::New => None,
            HistoryChoice::Existing(summary) => Some(format!(
                "{} · {} messages · {}",
                summary.updated_at.format("%Y-%m-%d %H:%M"),
                summary.message_count,
                summary.model
            )),
        }
    }

    fn pinned(&self) -> bool {
        matches!(self, HistoryChoice::New)
    }
}

/// A filterable list with a wrapping cursor over the visible entries.
#[derive(Debug, Clone)]
pub struct PickerState<T> {
    pub title: &'static str,
    pub items: Vec<T>,
    pub filter: String,
    pub cursor: usize,
    pub loading: bool,
}

impl<T: PickerEntry> PickerState<T> {
    pub fn loading(title: &'static str, items: Vec<T>) -> Self {
        Self {
            title,
            items,
            filter: String::new(),
            cursor: 0,
            loading: true,
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.loading = false;
        self.cursor = 0;
    }

    /// Indices into `items` that pass the filter, in order.
    pub fn visible(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.filter.is_empty() || item.matches(&self.filter))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected(&self) -> Option<&T> {
        self.visible()
            .get(self.cursor)
            .and_then(|&i| self.items.get(i))
    }

    pub fn move_down(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.cursor = (self.cursor + 1) % len;
        }
    }

    pub fn move_up(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.cursor = (self.cursor + len - 1) % len;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.visible().len().saturating_sub(1);
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.cursor = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.cursor = 0;
    }
}

/// Start of a window of at most `size` rows over `len` rows, centred on `cursor`.
pub fn window_start(len: usize, cursor: usize, size: usize) -> usize {
    if len <= size {
        return 0;
    }
    cursor.saturating_sub(size / 2).min(len - size)
}

#[derive(Debug, Clone)]
pub struct ImagePickerState {
    pub output: ModelOutput,
    pub cursor: usize,
    pub selected: BTreeSet<usize>,
    pub directory: PathBuf,
}

impl ImagePickerState {
    pub fn new(output: ModelOutput, directory: PathBuf) -> Self {
        Self {
            output,
            cursor: 0,
            selected: BTreeSet::new(),
            directory,
        }
    }

    pub fn images(&self) -> &[WebImage] {
        &self.output.images
    }

    pub fn move_down(&mut self) {
        let len = self.images().len();
        if len > 0 {
            self.cursor = (self.cursor + 1) % len;
        }
    }

    pub fn move_up(&mut self) {
        let len = self.images().len();
        if len > 0 {
            self.cursor = (self.cursor + len - 1) % len;
        }
    }

    pub fn toggle(&mut self) {
        if !self.selected.remove(&self.cursor) && self.cursor < self.images().len() {
            self.selected.insert(self.cursor);
        }
    }

    pub fn select_all(&mut self) {
        self.selected = (0..self.images().len()).collect();
    }

    pub fn select_none(&mut self) {
        self.selected.clear();
    }

    /// Indices to download; the highlighted image when nothing is toggled.
    pub fn chosen(&self) -> Vec<usize> {
        if self.selected.is_empty() {
            if self.images().is_empty() {
                Vec::new()
            } else {
                vec![self.cursor]
            }
        } else {
            self.selected.iter().copied().collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfirmation {
    pub call: ToolCall,
}
