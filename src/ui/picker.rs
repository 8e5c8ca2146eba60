//! Modal overlays drawn above the transcript: pickers and tool confirmation.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Padding, Paragraph};
use ratatui::Frame;

use crate::core::app::view::{
    window_start, ImagePickerState, PickerEntry, PickerState, ToolConfirmation, PICKER_WINDOW,
};
use crate::core::app::{App, ViewState};
use crate::ui::markdown::render_plain;
use crate::ui::theme::Theme;

const OVERLAY_MAX_WIDTH: u16 = 72;
const CURSOR: &str = "> ";

pub fn render_overlay(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let width = area.width.min(OVERLAY_MAX_WIDTH);
    // Border and horizontal padding.
    let text_width = usize::from(width.saturating_sub(4)).max(1);

    let (title, lines) = match &app.view {
        ViewState::Chat => return,
        ViewState::PickGem(state) => (state.title.to_string(), picker_lines(state, theme)),
        ViewState::PickHistory(state) => (state.title.to_string(), picker_lines(state, theme)),
        ViewState::PickImage(state) => ("Download images".to_string(), image_lines(state, theme)),
        ViewState::ConfirmTool(confirm) => (
            "Run tool?".to_string(),
            confirm_lines(confirm, theme, text_width),
        ),
    };

    let wanted = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let overlay = centered(area, width, wanted.min(area.height));
    let block = Block::bordered()
        .border_style(theme.border_style)
        .title(Span::styled(format!(" {title} "), theme.title_style))
        .padding(Padding::horizontal(1));
    f.render_widget(Clear, overlay);
    f.render_widget(Paragraph::new(lines).block(block), overlay);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn row(selected: bool, text: String, theme: &Theme) -> Vec<Span<'static>> {
    if selected {
        vec![
            Span::styled(CURSOR, theme.selection_highlight_style),
            Span::styled(text, theme.selection_highlight_style),
        ]
    } else {
        vec![Span::raw(" ".repeat(CURSOR.len())), Span::raw(text)]
    }
}

fn picker_lines<T: PickerEntry>(state: &PickerState<T>, theme: &Theme) -> Vec<Line<'static>> {
    if state.loading {
        return vec![Line::from(Span::styled("Loading...", theme.status_style))];
    }

    let mut lines = vec![if state.filter.is_empty() {
        Line::from(Span::styled("Type to filter", theme.status_style))
    } else {
        Line::from(vec![
            Span::styled("Filter: ", theme.status_style),
            Span::styled(state.filter.clone(), theme.input_text_style),
        ])
    }];

    let visible = state.visible();
    if visible.is_empty() {
        lines.push(Line::from(Span::styled("No matches", theme.status_style)));
        return lines;
    }

    let start = window_start(visible.len(), state.cursor, PICKER_WINDOW);
    for (offset, &index) in visible.iter().skip(start).take(PICKER_WINDOW).enumerate() {
        let Some(item) = state.items.get(index) else {
            continue;
        };
        let mut spans = row(start + offset == state.cursor, item.label(), theme);
        if let Some(detail) = item.detail() {
            spans.push(Span::styled(format!("  {detail}"), theme.header_detail_style));
        }
        lines.push(Line::from(spans));
    }
    if visible.len() > PICKER_WINDOW {
        lines.push(Line::from(Span::styled(
            format!("{}/{}", state.cursor + 1, visible.len()),
            theme.status_style,
        )));
    }
    lines
}

fn image_lines(state: &ImagePickerState, theme: &Theme) -> Vec<Line<'static>> {
    let images = state.images();
    let mut lines = Vec::new();
    let start = window_start(images.len(), state.cursor, PICKER_WINDOW);
    for (index, image) in images.iter().enumerate().skip(start).take(PICKER_WINDOW) {
        let mark = if state.selected.contains(&index) { "[x]" } else { "[ ]" };
        let name = [image.title.as_str(), image.alt.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("image");
        lines.push(Line::from(row(
            index == state.cursor,
            format!("{mark} {}. {name}", index + 1),
            theme,
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("Save to: {}", state.directory.display()),
        theme.status_style,
    )));
    lines
}

fn confirm_lines(confirm: &ToolConfirmation, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let call = &confirm.call;
    let mut lines = vec![Line::from(vec![
        Span::styled("Tool: ", theme.header_detail_style),
        Span::styled(call.name.clone(), theme.title_style),
    ])];
    let labelled = |label: &str, value: &str, style: Style| {
        render_plain(&format!("{label}{value}"), style, width)
    };
    if !call.reason.trim().is_empty() {
        lines.extend(labelled("Reason: ", call.reason.trim(), theme.tool_text_style));
    }
    lines.extend(labelled("Args: ", &call.args_json(), theme.code_style));
    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("[y]", theme.badge_style),
        Span::raw(" approve  "),
        Span::styled("[n]", theme.badge_style),
        Span::raw(" deny"),
    ]));
    lines
}
