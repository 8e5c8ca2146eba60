use ratatui::style::Style;
use tui_textarea::{CursorMove, TextArea};

use crate::core::error::ChatError;
use crate::ui::theme::Theme;

pub const HEADER_HEIGHT: u16 = 4;
pub const INPUT_HEIGHT: u16 = 7;
pub const STATUS_HEIGHT: u16 = 1;
pub const LAYOUT_PADDING: u16 = 2;
pub const MIN_VIEWPORT_HEIGHT: u16 = 5;

/// Transient message shown above the input; errors and notices exclude each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Error(ChatError),
    Notice(String),
}

pub struct UiState {
    pub theme: Theme,
    pub markdown_enabled: bool,
    textarea: TextArea<'static>,
    pub loading: bool,
    pub tick_scheduled: bool,
    /// Animation frame, advanced by ticks while loading.
    pub frame: u64,
    pub width: u16,
    pub height: u16,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_offset: usize,
    pub banner: Option<Banner>,
    pub extension_hint: Option<String>,
    pub exit_requested: bool,
}

impl UiState {
    pub fn new(theme: Theme, markdown_enabled: bool) -> Self {
        let mut ui = Self {
            theme,
            markdown_enabled,
            textarea: TextArea::default(),
            loading: false,
            tick_scheduled: false,
            frame: 0,
            width: 80,
            height: 24,
            scroll_offset: 0,
            banner: None,
            extension_hint: None,
            exit_requested: false,
        };
        ui.configure_textarea();
        ui
    }

    fn configure_textarea(&mut self) {
        self.textarea.set_style(self.theme.input_text_style);
        self.textarea.set_cursor_style(self.theme.input_cursor_style);
        self.textarea.set_cursor_line_style(Style::default());
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn apply_textarea_edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut TextArea<'static>),
    {
        f(&mut self.textarea);
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Replace the input and put the cursor at the end.
    pub fn set_input_text(&mut self, text: &str) {
        let lines: Vec<String> = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        self.textarea = TextArea::from(lines);
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
        self.configure_textarea();
    }

    pub fn clear_input(&mut self) {
        self.set_input_text("");
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.textarea.cursor()
    }

    pub fn set_error(&mut self, error: ChatError) {
        self.banner = Some(Banner::Error(error));
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.banner = Some(Banner::Notice(notice.into()));
    }

    pub fn clear_banner(&mut self) {
        self.banner = None;
    }

    pub fn error(&self) -> Option<&ChatError> {
        match &self.banner {
            Some(Banner::Error(error)) => Some(error),
            _ => None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match &self.banner {
            Some(Banner::Notice(notice)) => Some(notice),
            _ => None,
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn viewport_height(&self) -> u16 {
        self.height
            .saturating_sub(HEADER_HEIGHT + INPUT_HEIGHT + STATUS_HEIGHT + LAYOUT_PADDING)
            .max(MIN_VIEWPORT_HEIGHT)
    }

    pub fn content_width(&self) -> u16 {
        self.width.saturating_sub(4)
    }

    pub fn scroll_up(&mut self, lines: usize, max_offset: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(max_offset);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}
