//! Frame composition for the chat view.
//!
//! [`ui`] is a pure function of [`App`]: it never mutates state, so drawing
//! the same state twice yields the same buffer.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Padding, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::core::app::ui_state::{HEADER_HEIGHT, INPUT_HEIGHT, STATUS_HEIGHT};
use crate::core::app::{App, Banner, ViewState};
use crate::core::message::{ChatEntry, EntryRole};
use crate::ui::markdown::{render_markdown, render_plain};
use crate::ui::theme::Theme;
use crate::ui::{loading, picker};

const EMPTY_HINT: &str = "Ask Gemini anything. /help lists commands.";

pub fn ui(f: &mut Frame, app: &App) {
    let [header, messages, input, status] = Layout::vertical([
        Constraint::Length(HEADER_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(f.area());

    render_header(f, app, header);
    let transcript = render_messages(f, app, messages);
    render_input(f, app, input);
    render_status(f, app, status);

    if !app.view.is_chat() {
        picker::render_overlay(f, app, transcript);
    }
}

/// Lines for a sequence of entries laid out at `width` columns.
pub fn render_entries(
    entries: &[ChatEntry],
    theme: &Theme,
    markdown: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in entries {
        render_entry(entry, theme, markdown, width, &mut lines);
        lines.push(Line::default());
    }
    lines.pop();
    lines
}

fn render_entry(
    entry: &ChatEntry,
    theme: &Theme,
    markdown: bool,
    width: usize,
    out: &mut Vec<Line<'static>>,
) {
    let (prefix_style, text_style) = match entry.role {
        EntryRole::User => (theme.user_prefix_style, theme.user_text_style),
        EntryRole::Assistant => (theme.assistant_prefix_style, theme.assistant_text_style),
        EntryRole::Tool => (theme.tool_prefix_style, theme.tool_text_style),
    };
    out.push(Line::from(Span::styled(entry.role.speaker(), prefix_style)));

    if let Some(thoughts) = entry.thoughts.as_deref().filter(|t| !t.trim().is_empty()) {
        out.push(Line::from(Span::styled("Thinking:", theme.thoughts_style)));
        out.extend(render_plain(thoughts.trim(), theme.thoughts_style, width));
    }

    if !entry.content.is_empty() {
        let body = if markdown && !entry.role.is_user() {
            render_markdown(&entry.content, text_style, theme, width)
                .unwrap_or_else(|_| render_plain(&entry.content, text_style, width))
        } else {
            render_plain(&entry.content, text_style, width)
        };
        out.extend(body);
    }

    for (index, image) in entry.images.iter().enumerate() {
        let label = [image.title.as_str(), image.alt.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("image");
        let text = format!("[{}] {label} {}", index + 1, image.url);
        out.extend(render_plain(&text, theme.link_style, width));
    }
}

/// The whole transcript at the current content width.
pub fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    render_entries(
        &app.session.messages,
        &app.ui.theme,
        app.ui.markdown_enabled,
        usize::from(app.ui.content_width()),
    )
}

/// Furthest the transcript can scroll up from the bottom.
pub fn max_scroll_offset(app: &App) -> usize {
    transcript_lines(app)
        .len()
        .saturating_sub(usize::from(app.ui.viewport_height()))
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let title = app.session.title().unwrap_or("New conversation").to_string();

    let mut details = vec![Span::styled(
        format!("Model: {}", app.model()),
        theme.header_detail_style,
    )];
    if let Some(gem) = &app.session.active_gem {
        details.push(Span::styled(format!(" · Gem: {gem}"), theme.header_detail_style));
    }
    if let Some(persona) = app.personas.active() {
        details.push(Span::styled(
            format!(" · Persona: {}", persona.name),
            theme.header_detail_style,
        ));
    }

    let block = Block::bordered()
        .border_style(theme.border_style)
        .title(Span::styled(" geminiweb ", theme.title_style))
        .padding(Padding::horizontal(1));
    let lines = vec![
        Line::from(Span::styled(title, theme.title_style)),
        Line::from(details),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draws the transcript and banner; returns the inner transcript area.
fn render_messages(f: &mut Frame, app: &App, area: Rect) -> Rect {
    let theme = &app.ui.theme;
    let mut block = Block::bordered()
        .border_style(theme.border_style)
        .padding(Padding::horizontal(1));

    let inner = block.inner(area);
    let lines = render_entries(
        &app.session.messages,
        theme,
        app.ui.markdown_enabled,
        usize::from(inner.width),
    );
    let visible = usize::from(inner.height);
    let max_offset = lines.len().saturating_sub(visible);
    let offset = app.ui.scroll_offset.min(max_offset);
    if offset > 0 {
        block = block.title_bottom(Line::from(format!(" ↓ {offset} more ")).right_aligned());
    }

    let top = u16::try_from(max_offset - offset).unwrap_or(u16::MAX);
    let paragraph = if lines.is_empty() {
        Paragraph::new(Line::from(Span::styled(EMPTY_HINT, theme.status_style)))
    } else {
        Paragraph::new(lines).scroll((top, 0))
    };
    f.render_widget(paragraph.block(block), area);

    if let Some(banner) = &app.ui.banner {
        render_banner(f, banner, theme, inner);
    }
    inner
}

fn banner_lines(banner: &Banner, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let (texts, style): (Vec<String>, Style) = match banner {
        Banner::Error(error) => (error.banner_lines(), theme.error_style),
        Banner::Notice(notice) => (vec![notice.clone()], theme.notice_style),
    };
    texts
        .iter()
        .flat_map(|text| render_plain(text, style, width))
        .collect()
}

fn render_banner(f: &mut Frame, banner: &Banner, theme: &Theme, area: Rect) {
    let mut lines = banner_lines(banner, theme, usize::from(area.width));
    let height = lines.len().min(usize::from(area.height));
    lines.truncate(height);
    let height = u16::try_from(height).unwrap_or(area.height);
    let banner_area = Rect {
        y: area.y + area.height - height,
        height,
        ..area
    };
    f.render_widget(Clear, banner_area);
    f.render_widget(Paragraph::new(lines), banner_area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let attachments = app.session.attachments.len();
    let title = if attachments > 0 {
        format!(" Message · {attachments} attachment(s) ")
    } else {
        " Message ".to_string()
    };
    let block = Block::bordered()
        .border_style(theme.border_style)
        .title(Span::styled(title, theme.header_detail_style));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.ui.loading {
        f.render_widget(
            Paragraph::new(loading::indicator(app.ui.frame, theme)),
            inner,
        );
    } else {
        f.render_widget(app.ui.textarea(), inner);
    }
}

fn status_hints(app: &App) -> &'static str {
    match &app.view {
        ViewState::Chat if app.ui.loading => "Esc cancel · Ctrl-C quit",
        ViewState::Chat => {
            "Enter send · \\+Enter newline · Ctrl-G gems · Ctrl-E export · /help · Esc quit"
        }
        ViewState::PickGem(_) | ViewState::PickHistory(_) => {
            "↑/↓ move · type to filter · Enter select · Esc close"
        }
        ViewState::PickImage(_) => {
            "↑/↓ move · Space toggle · a all · n none · Enter download · Esc close"
        }
        ViewState::ConfirmTool(_) => "y approve · n deny · Ctrl-C quit",
    }
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let badge = app
        .ui
        .extension_hint
        .as_ref()
        .filter(|_| app.view.is_chat())
        .map(|ext| format!(" @{ext} "));
    let badge_width = badge
        .as_deref()
        .map_or(0, |b| u16::try_from(b.width()).unwrap_or(0));

    let [hints, badge_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(badge_width)]).areas(area);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(status_hints(app), theme.status_style))),
        hints,
    );
    if let Some(badge) = badge {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(badge, theme.badge_style))),
            badge_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::WebImage;
    use crate::core::error::{ChatError, ErrorKind};
    use crate::utils::test_utils::create_test_app;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;

    fn draw(app: &App) -> Buffer {
        let mut terminal =
            Terminal::new(TestBackend::new(app.ui.width, app.ui.height)).expect("terminal");
        terminal.draw(|f| ui(f, app)).expect("draw");
        terminal.backend().buffer().clone()
    }

    fn screen(buffer: &Buffer) -> String {
        let width = usize::from(buffer.area.width);
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn chat_view_shows_header_transcript_and_hints() {
        let mut app = create_test_app();
        app.session.messages.push(ChatEntry::user("What is Rust?"));
        app.session.messages.push(ChatEntry::assistant(
            "A **systems** language.",
            None,
            Vec::new(),
        ));
        let text = screen(&draw(&app));

        assert!(text.contains("New conversation"));
        assert!(text.contains("Model: test-model"));
        assert!(text.contains("What is Rust?"));
        assert!(text.contains("A systems language."));
        assert!(text.contains("Enter send"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut app = create_test_app();
        app.session.messages.push(ChatEntry::user("hello"));
        app.ui.set_notice("Saved");
        assert_eq!(draw(&app), draw(&app));
    }

    #[test]
    fn loading_replaces_input_with_indicator() {
        let mut app = create_test_app();
        app.ui.set_input_text("draft text");
        app.ui.loading = true;
        app.ui.frame = 5;
        let text = screen(&draw(&app));
        assert!(text.contains("Gemini is thinking"));
        assert!(!text.contains("draft text"));
        assert!(text.contains("Esc cancel"));
    }

    #[test]
    fn error_banner_shows_details_and_hint() {
        let mut app = create_test_app();
        app.ui.set_error(ChatError::new(ErrorKind::Network, "connection reset").with_status(502));
        let text = screen(&draw(&app));
        assert!(text.contains("Error: connection reset"));
        assert!(text.contains("HTTP 502"));
        assert!(text.contains("Check connection and try again."));
    }

    #[test]
    fn extension_badge_and_attachments_are_shown() {
        let mut app = create_test_app();
        app.ui.extension_hint = Some("youtube".into());
        app.session.attachments.push(crate::api::UploadedFile {
            id: "1".into(),
            name: "a.png".into(),
        });
        let text = screen(&draw(&app));
        assert!(text.contains("@youtube"));
        assert!(text.contains("1 attachment(s)"));
    }

    #[test]
    fn entries_render_thoughts_and_images() {
        let theme = Theme::dark_default();
        let entry = ChatEntry::assistant(
            "Here you go",
            Some("pick a cat".into()),
            vec![WebImage {
                url: "https://img/cat".into(),
                title: "Cat".into(),
                alt: String::new(),
            }],
        );
        let lines = render_entries(&[entry], &theme, true, 40);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(
            text,
            vec!["Gemini", "Thinking:", "pick a cat", "Here you go", "[1] Cat https://img/cat"]
        );
    }

    #[test]
    fn scroll_offset_is_bounded_by_transcript() {
        let mut app = create_test_app();
        assert_eq!(max_scroll_offset(&app), 0);
        for i in 0..10 {
            app.session.messages.push(ChatEntry::user(format!("message {i}")));
        }
        // 10 entries of 2 lines plus 9 separators against a 10-line viewport.
        assert_eq!(max_scroll_offset(&app), 29 - 10);
    }

    #[test]
    fn narrow_terminals_fall_back_to_plain_text() {
        let theme = Theme::dark_default();
        let entry = ChatEntry::assistant("**bold**", None, Vec::new());
        let lines = render_entries(&[entry], &theme, true, 4);
        let body: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(body, "**bo");
    }
}
