use ratatui::style::Style;
use ratatui::text::Span;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Wrap styled spans to `width` columns, breaking at whitespace where possible.
///
/// Words wider than a whole line are hard-broken. Whitespace at a wrap point
/// is dropped. Always returns at least one (possibly empty) line.
pub(crate) fn wrap_spans(spans: &[Span<'static>], width: usize) -> Vec<Vec<Span<'static>>> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line: Vec<Span<'static>> = Vec::new();
    let mut line_width = 0usize;
    let mut pending_space: Option<(String, Style)> = None;

    for span in spans {
        for token in split_words(&span.content) {
            if token.chars().all(char::is_whitespace) {
                if line_width > 0 {
                    pending_space = Some((token.to_string(), span.style));
                }
                continue;
            }

            let token_width = token.width();
            let space_width = pending_space.as_ref().map_or(0, |(space, _)| space.width());
            if line_width > 0 && line_width + space_width + token_width > width {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
                pending_space = None;
            }
            if let Some((space, style)) = pending_space.take() {
                line_width += space.width();
                line.push(Span::styled(space, style));
            }

            if line_width + token_width <= width {
                line.push(Span::styled(token.to_string(), span.style));
                line_width += token_width;
                continue;
            }

            let mut chunk = String::new();
            let mut chunk_width = 0usize;
            for ch in token.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if line_width + chunk_width + ch_width > width && line_width + chunk_width > 0 {
                    if !chunk.is_empty() {
                        line.push(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                    chunk_width = 0;
                }
                chunk.push(ch);
                chunk_width += ch_width;
            }
            if !chunk.is_empty() {
                line.push(Span::styled(chunk, span.style));
                line_width += chunk_width;
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Hard-wrap one line of preformatted text, keeping its whitespace.
pub(crate) fn wrap_preformatted(text: &str, style: Style, width: usize) -> Vec<Span<'static>> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut chunk = String::new();
    let mut chunk_width = 0usize;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if chunk_width + ch_width > width && !chunk.is_empty() {
            out.push(Span::styled(std::mem::take(&mut chunk), style));
            chunk_width = 0;
        }
        chunk.push(ch);
        chunk_width += ch_width;
    }
    out.push(Span::styled(chunk, style));
    out
}

/// Split into alternating runs of whitespace and non-whitespace.
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0usize;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}
