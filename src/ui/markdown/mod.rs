//! Markdown to pre-wrapped terminal lines.
//!
//! [`render_markdown`] lays out a message for a fixed column width using
//! `pulldown-cmark`; callers fall back to [`render_plain`] when it refuses.

mod render;
mod wrap;

use std::fmt;

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;

pub(crate) use wrap::wrap_spans;

/// Narrowest width the markdown layout accepts.
pub const MIN_RENDER_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownError {
    TooNarrow { width: usize },
}

impl fmt::Display for MarkdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkdownError::TooNarrow { width } => write!(
                f,
                "width {width} is below the minimum of {MIN_RENDER_WIDTH} columns"
            ),
        }
    }
}

impl std::error::Error for MarkdownError {}

/// Render `content` as markdown wrapped to `width` columns.
pub fn render_markdown(
    content: &str,
    base: Style,
    theme: &Theme,
    width: usize,
) -> Result<Vec<Line<'static>>, MarkdownError> {
    if width < MIN_RENDER_WIDTH {
        return Err(MarkdownError::TooNarrow { width });
    }
    Ok(render::MarkdownRenderer::new(theme, base, width).render(content))
}

/// Wrap `content` as plain text, keeping its explicit line breaks.
pub fn render_plain(content: &str, style: Style, width: usize) -> Vec<Line<'static>> {
    content
        .split('\n')
        .flat_map(|line| wrap_spans(&[Span::styled(line.to_string(), style)], width))
        .map(Line::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn render(content: &str, width: usize) -> Vec<String> {
        let theme = Theme::dark_default();
        let lines =
            render_markdown(content, theme.assistant_text_style, &theme, width).expect("render");
        texts(&lines)
    }

    #[test]
    fn narrow_widths_are_refused() {
        let theme = Theme::dark_default();
        assert_eq!(
            render_markdown("hi", Style::default(), &theme, 7),
            Err(MarkdownError::TooNarrow { width: 7 })
        );
    }

    #[test]
    fn paragraphs_are_separated_and_wrapped() {
        assert_eq!(
            render("first paragraph here\n\nsecond", 12),
            vec!["first", "paragraph", "here", "", "second"]
        );
    }

    #[test]
    fn lists_get_markers_and_hanging_indent() {
        assert_eq!(
            render("- alpha beta gamma\n- two\n\n1. one\n2. deux", 12),
            vec!["- alpha beta", "  gamma", "- two", "", "1. one", "2. deux"]
        );
    }

    #[test]
    fn nested_lists_indent() {
        assert_eq!(
            render("- outer\n  - inner", 20),
            vec!["- outer", "  - inner"]
        );
    }

    #[test]
    fn code_blocks_keep_whitespace() {
        assert_eq!(
            render("```rust\nfn main() {\n    go();\n}\n```", 30),
            vec!["  fn main() {", "      go();", "  }"]
        );
    }

    #[test]
    fn links_show_their_target() {
        assert_eq!(
            render("see [docs](https://example.com) now", 60),
            vec!["see docs (https://example.com) now"]
        );
        assert_eq!(
            render("<https://example.com>", 60),
            vec!["https://example.com"]
        );
    }

    #[test]
    fn headings_quotes_and_rules() {
        let lines = render("# Title\n\n> quoted\n\n---\n\nend", 10);
        assert_eq!(lines[0], "Title");
        assert_eq!(lines[2], "│ quoted");
        assert_eq!(lines[4], "─".repeat(10));
        assert_eq!(lines.last().map(String::as_str), Some("end"));
    }

    #[test]
    fn inline_styles_are_applied() {
        let theme = Theme::dark_default();
        let lines = render_markdown("a **b** `c`", Style::default(), &theme, 20).expect("render");
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "b")
            .expect("bold span");
        assert!(bold
            .style
            .add_modifier
            .contains(ratatui::style::Modifier::BOLD));
        let code = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "c")
            .expect("code span");
        assert_eq!(code.style, theme.code_style);
    }

    #[test]
    fn plain_rendering_keeps_line_breaks() {
        let lines = render_plain("one\n\ntwo three", Style::default(), 5);
        assert_eq!(texts(&lines), vec!["one", "", "two", "three"]);
    }
}
