//! Full-screen history manager.
//!
//! Runs synchronously on the chat terminal while the event reader is paused.
//! Store failures are reported inline and never close the manager.

use std::sync::Arc;

use ratatui::backend::Backend;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Padding, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::{debug, warn};

use crate::core::app::view::window_start;
use crate::core::error::{ChatError, ErrorKind};
use crate::core::history::{ConversationSummary, FullHistoryStore, HistoryError};
use crate::ui::theme::Theme;

const HINTS: &str = "↑/↓ move · Enter open · d delete · f favorite · K/J reorder · q close";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerStep {
    Continue,
    Open(String),
    Close,
}

pub struct HistoryManager {
    store: Arc<dyn FullHistoryStore>,
    items: Vec<ConversationSummary>,
    cursor: usize,
    /// Conversation awaiting a delete confirmation.
    pending_delete: Option<String>,
    status: Option<String>,
}

impl HistoryManager {
    pub fn new(store: Arc<dyn FullHistoryStore>) -> Result<Self, ChatError> {
        let items = store.list_conversations()?;
        Ok(Self {
            store,
            items,
            cursor: 0,
            pending_delete: None,
            status: None,
        })
    }

    pub fn items(&self) -> &[ConversationSummary] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn selected_id(&self) -> Option<String> {
        self.items.get(self.cursor).map(|item| item.id.clone())
    }

    /// Re-read the list and keep the cursor on `focus` when it survives.
    fn reload(&mut self, focus: Option<&str>) {
        match self.store.list_conversations() {
            Ok(items) => self.items = items,
            Err(err) => {
                warn!(error = %err, "Could not list conversations");
                self.status = Some(format!("Error: {err}"));
            }
        }
        self.cursor = focus
            .and_then(|id| self.items.iter().position(|item| item.id == id))
            .unwrap_or_else(|| self.cursor.min(self.items.len().saturating_sub(1)));
    }

    fn report<T>(&mut self, result: Result<T, HistoryError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "History manager operation failed");
                self.status = Some(format!("Error: {err}"));
                None
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ManagerStep {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ManagerStep::Close;
        }

        if let Some(id) = self.pending_delete.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                if self.report(self.store.delete_conversation(&id)).is_some() {
                    debug!(conversation_id = %id, "Deleted conversation");
                    self.status = Some("Deleted".into());
                }
                self.reload(None);
            } else {
                self.status = Some("Delete cancelled".into());
            }
            return ManagerStep::Continue;
        }

        self.status = None;
        let len = self.items.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return ManagerStep::Close,
            KeyCode::Up | KeyCode::Char('k') if len > 0 => {
                self.cursor = (self.cursor + len - 1) % len;
            }
            KeyCode::Down | KeyCode::Char('j') if len > 0 => {
                self.cursor = (self.cursor + 1) % len;
            }
            KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    return ManagerStep::Open(id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(item) = self.items.get(self.cursor) {
                    self.status = Some(format!(
                        "Delete \"{}\"? y to confirm",
                        item.display_title()
                    ));
                    self.pending_delete = Some(item.id.clone());
                }
            }
            KeyCode::Char('f') => {
                if let Some(id) = self.selected_id() {
                    if let Some(favorite) = self.report(self.store.toggle_favorite(&id)) {
                        self.status = Some(if favorite { "Favorited" } else { "Unfavorited" }.into());
                    }
                    self.reload(Some(&id));
                }
            }
            KeyCode::Char('K') => self.swap_with(self.cursor.checked_sub(1)),
            KeyCode::Char('J') => self.swap_with(Some(self.cursor + 1).filter(|&i| i < len)),
            _ => {}
        }
        ManagerStep::Continue
    }

    /// Reorder within the favorite or non-favorite group only.
    fn swap_with(&mut self, neighbour: Option<usize>) {
        let (Some(current), Some(other)) = (
            self.items.get(self.cursor),
            neighbour.and_then(|i| self.items.get(i)),
        ) else {
            return;
        };
        if current.favorite != other.favorite {
            self.status = Some("Favorites stay above other conversations".into());
            return;
        }
        let (id, other) = (current.id.clone(), other.id.clone());
        self.report(self.store.swap_conversations(&id, &other));
        self.reload(Some(&id));
    }

    pub fn render(&self, f: &mut Frame, theme: &Theme) {
        let [list_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(f.area());

        let block = Block::bordered()
            .border_style(theme.border_style)
            .title(Span::styled(" Conversations ", theme.title_style))
            .padding(Padding::horizontal(1));
        let inner = block.inner(list_area);
        f.render_widget(block, list_area);
        self.render_list(f, theme, inner);

        let status = match &self.status {
            Some(status) => Line::from(Span::styled(status.clone(), theme.notice_style)),
            None => Line::from(Span::styled(HINTS, theme.status_style)),
        };
        f.render_widget(Paragraph::new(status), status_area);
    }

    fn render_list(&self, f: &mut Frame, theme: &Theme, area: Rect) {
        if self.items.is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled("No saved conversations", theme.status_style)),
                area,
            );
            return;
        }
        let rows = usize::from(area.height).max(1);
        let start = window_start(self.items.len(), self.cursor, rows);
        let lines: Vec<Line<'static>> = self
            .items
            .iter()
            .enumerate()
            .skip(start)
            .take(rows)
            .map(|(index, item)| {
                let star = if item.favorite { "★ " } else { "" };
                let text = format!("{star}{}", item.display_title());
                let detail = format!(
                    "  {} · {} messages",
                    item.updated_at.format("%Y-%m-%d %H:%M"),
                    item.message_count
                );
                if index == self.cursor {
                    Line::from(vec![
                        Span::styled(format!("> {text}"), theme.selection_highlight_style),
                        Span::styled(detail, theme.header_detail_style),
                    ])
                } else {
                    Line::from(vec![
                        Span::raw(format!("  {text}")),
                        Span::styled(detail, theme.header_detail_style),
                    ])
                }
            })
            .collect();
        f.render_widget(Paragraph::new(lines), area);
    }
}

/// Drive the manager until it closes; returns the conversation to open.
pub fn run_history_manager<B: Backend>(
    terminal: &mut Terminal<B>,
    store: Arc<dyn FullHistoryStore>,
    theme: &Theme,
) -> Result<Option<String>, ChatError> {
    let io_error = |err: std::io::Error| ChatError::new(ErrorKind::Persistence, err.to_string());
    let mut manager = HistoryManager::new(store)?;
    loop {
        terminal
            .draw(|f| manager.render(f, theme))
            .map_err(io_error)?;
        let Event::Key(key) = event::read().map_err(io_error)? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match manager.handle_key(key) {
            ManagerStep::Continue => {}
            ManagerStep::Open(id) => return Ok(Some(id)),
            ManagerStep::Close => return Ok(None),
        }
    }
}
