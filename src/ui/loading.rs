//! Animated "waiting for the model" indicator.
//!
//! Everything here is a pure function of the animation frame so a render
//! never depends on wall-clock time.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const LABEL: &str = "Gemini is thinking";
/// Frames per added dot.
const DOT_FRAMES: u64 = 4;
const MAX_DOTS: u64 = 3;

/// Delay between animation ticks.
pub const TICK_INTERVAL_MS: u64 = 80;

pub fn spinner(frame: u64) -> &'static str {
    SPINNER[(frame % SPINNER.len() as u64) as usize]
}

/// Colour for the character at `position`, rotated by `frame`.
pub fn gradient_style(theme: &Theme, frame: u64, position: usize) -> Style {
    if theme.gradient.is_empty() {
        return theme.title_style;
    }
    let len = theme.gradient.len();
    let index = (position + (frame % len as u64) as usize) % len;
    Style::default()
        .fg(theme.gradient[index])
        .add_modifier(Modifier::BOLD)
}

pub fn indicator(frame: u64, theme: &Theme) -> Line<'static> {
    let mut spans = vec![
        Span::styled(spinner(frame), gradient_style(theme, frame, 0)),
        Span::raw(" "),
    ];
    spans.extend(
        LABEL
            .chars()
            .enumerate()
            .map(|(i, ch)| Span::styled(ch.to_string(), gradient_style(theme, frame, i))),
    );
    let dots = (frame / DOT_FRAMES) % (MAX_DOTS + 1);
    spans.push(Span::styled(".".repeat(dots as usize), theme.status_style));
    Line::from(spans)
}
