use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background_color: Color,

    // Transcript
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_prefix_style: Style,
    pub assistant_text_style: Style,
    pub tool_prefix_style: Style,
    pub tool_text_style: Style,
    pub thoughts_style: Style,
    pub code_style: Style,
    pub link_style: Style,
    pub heading_style: Style,
    pub blockquote_style: Style,
    pub list_marker_style: Style,

    // Chrome
    pub title_style: Style,
    pub header_detail_style: Style,
    pub border_style: Style,
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub status_style: Style,
    pub badge_style: Style,
    pub error_style: Style,
    pub notice_style: Style,
    pub selection_highlight_style: Style,

    /// Loading indicator colors, rotated by animation frame.
    pub gradient: Vec<Color>,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Reset,
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_prefix_style: Style::default()
                .fg(Color::Rgb(138, 180, 248))
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::White),
            tool_prefix_style: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            tool_text_style: Style::default().fg(Color::Gray),
            thoughts_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            code_style: Style::default().fg(Color::LightGreen),
            link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            heading_style: Style::default()
                .fg(Color::Rgb(138, 180, 248))
                .add_modifier(Modifier::BOLD),
            blockquote_style: Style::default().fg(Color::Gray),
            list_marker_style: Style::default().fg(Color::Yellow),

            title_style: Style::default()
                .fg(Color::Rgb(138, 180, 248))
                .add_modifier(Modifier::BOLD),
            header_detail_style: Style::default().fg(Color::Gray),
            border_style: Style::default().fg(Color::DarkGray),
            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            status_style: Style::default().fg(Color::DarkGray),
            badge_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(138, 180, 248)),
            error_style: Style::default().fg(Color::LightRed),
            notice_style: Style::default().fg(Color::LightGreen),
            selection_highlight_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan),

            gradient: vec![
                Color::Rgb(66, 133, 244),
                Color::Rgb(155, 114, 203),
                Color::Rgb(217, 101, 112),
                Color::Rgb(155, 114, 203),
            ],
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: Color::Reset,
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Blue),
            assistant_prefix_style: Style::default()
                .fg(Color::Rgb(26, 115, 232))
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::Black),
            tool_prefix_style: Style::default()
                .fg(Color::Rgb(176, 96, 0))
                .add_modifier(Modifier::BOLD),
            tool_text_style: Style::default().fg(Color::DarkGray),
            thoughts_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            code_style: Style::default().fg(Color::Rgb(24, 128, 56)),
            link_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            heading_style: Style::default()
                .fg(Color::Rgb(26, 115, 232))
                .add_modifier(Modifier::BOLD),
            blockquote_style: Style::default().fg(Color::DarkGray),
            list_marker_style: Style::default().fg(Color::Rgb(176, 96, 0)),

            title_style: Style::default()
                .fg(Color::Rgb(26, 115, 232))
                .add_modifier(Modifier::BOLD),
            header_detail_style: Style::default().fg(Color::DarkGray),
            border_style: Style::default().fg(Color::Gray),
            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            status_style: Style::default().fg(Color::DarkGray),
            badge_style: Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(26, 115, 232)),
            error_style: Style::default().fg(Color::Red),
            notice_style: Style::default().fg(Color::Rgb(24, 128, 56)),
            selection_highlight_style: Style::default()
                .fg(Color::White)
                .bg(Color::Blue),

            gradient: vec![
                Color::Rgb(26, 115, 232),
                Color::Rgb(123, 31, 162),
                Color::Rgb(197, 34, 31),
                Color::Rgb(123, 31, 162),
            ],
        }
    }

    /// Look up a built-in theme by name; unknown names fall back to dark.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("light") => Self::light(),
            _ => Self::dark_default(),
        }
    }
}
