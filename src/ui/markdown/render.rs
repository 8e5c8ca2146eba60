use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use super::wrap::{wrap_preformatted, wrap_spans};
use crate::ui::theme::Theme;

const QUOTE_BAR: &str = "│ ";
const CODE_INDENT: usize = 2;
const RULE_CHAR: &str = "─";

#[derive(Clone, Copy, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

struct ListLevel {
    kind: ListKind,
    /// Column where the current item's content starts.
    content_indent: usize,
}

/// Marker waiting for the first line of its list item.
struct PendingMarker {
    indent: usize,
    marker: String,
}

pub(super) struct MarkdownRenderer<'a> {
    theme: &'a Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    lists: Vec<ListLevel>,
    pending_marker: Option<PendingMarker>,
    quote_depth: usize,
    code_block: Option<String>,
    /// Link target and the index of the first span of its text.
    links: Vec<(String, usize)>,
}

impl<'a> MarkdownRenderer<'a> {
    pub(super) fn new(theme: &'a Theme, base: Style, width: usize) -> Self {
        Self {
            theme,
            width,
            lines: Vec::new(),
            current: Vec::new(),
            style_stack: vec![base],
            lists: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            code_block: None,
            links: Vec::new(),
        }
    }

    pub(super) fn render(mut self, content: &str) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        for event in Parser::new_ext(content, options) {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(tag) => self.end(tag),
                Event::Text(text) => {
                    if let Some(code) = self.code_block.as_mut() {
                        code.push_str(&text);
                    } else {
                        self.push_text(text.into_string());
                    }
                }
                Event::Code(code) => {
                    self.current
                        .push(Span::styled(code.into_string(), self.theme.code_style));
                }
                Event::Html(html) | Event::InlineHtml(html) => {
                    self.push_text(html.trim_end_matches('\n').to_string());
                }
                Event::InlineMath(math) | Event::DisplayMath(math) => {
                    self.current
                        .push(Span::styled(math.into_string(), self.theme.code_style));
                }
                Event::SoftBreak => self.push_text(" ".to_string()),
                Event::HardBreak => self.flush(),
                Event::Rule => {
                    self.flush();
                    let quote = self.quote_prefix();
                    let avail = self.width.saturating_sub(quote.width()).max(1);
                    let mut spans = self.prefix_spans(false);
                    spans.push(Span::styled(
                        RULE_CHAR.repeat(avail),
                        self.theme.blockquote_style,
                    ));
                    self.lines.push(Line::from(spans));
                    self.push_blank();
                }
                Event::TaskListMarker(done) => {
                    let mark = if done { "[x] " } else { "[ ] " };
                    self.current
                        .push(Span::styled(mark, self.theme.list_marker_style));
                }
                Event::FootnoteReference(name) => self.push_text(format!("[^{name}]")),
            }
        }

        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.flush();
                self.style_stack.push(self.theme.heading_style);
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
                let style = self.style().patch(self.theme.blockquote_style);
                self.style_stack.push(style);
            }
            Tag::List(start) => {
                self.flush();
                let kind = match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Unordered,
                };
                self.lists.push(ListLevel {
                    kind,
                    content_indent: self.content_indent(),
                });
            }
            Tag::Item => {
                self.flush();
                let parent = match self.lists.len() {
                    0 | 1 => 0,
                    n => self.lists[n - 2].content_indent,
                };
                let marker = match self.lists.last_mut() {
                    Some(level) => match &mut level.kind {
                        ListKind::Unordered => "- ".to_string(),
                        ListKind::Ordered(next) => {
                            let marker = format!("{next}. ");
                            *next += 1;
                            marker
                        }
                    },
                    None => "- ".to_string(),
                };
                if let Some(level) = self.lists.last_mut() {
                    level.content_indent = parent + marker.width();
                }
                self.pending_marker = Some(PendingMarker {
                    indent: parent,
                    marker,
                });
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.code_block = Some(String::new());
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } => {
                let style = self.style().patch(self.theme.link_style);
                self.style_stack.push(style);
                self.links.push((dest_url.into_string(), self.current.len()));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.push_blank();
                }
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.style_stack.pop();
                self.push_blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.style_stack.pop();
                self.push_blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.push_blank();
                }
            }
            TagEnd::Item => {
                self.flush();
                if self.pending_marker.is_some() {
                    let spans = self.prefix_spans(true);
                    self.lines.push(Line::from(spans));
                }
            }
            TagEnd::CodeBlock => {
                let code = self.code_block.take().unwrap_or_default();
                self.render_code(&code);
                if self.lists.is_empty() {
                    self.push_blank();
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link => {
                self.style_stack.pop();
                if let Some((url, start)) = self.links.pop() {
                    let text: String = self.current[start.min(self.current.len())..]
                        .iter()
                        .map(|span| span.content.as_ref())
                        .collect();
                    if !url.is_empty() && text != url {
                        self.current
                            .push(Span::styled(format!(" ({url})"), self.theme.link_style));
                    }
                }
            }
            _ => {}
        }
    }

    fn render_code(&mut self, code: &str) {
        if self.pending_marker.is_some() {
            let spans = self.prefix_spans(true);
            self.lines.push(Line::from(spans));
        }
        let indent = self.quote_prefix().width() + self.content_indent() + CODE_INDENT;
        let avail = self.width.saturating_sub(indent).max(1);
        for source_line in code.trim_end_matches('\n').split('\n') {
            for chunk in wrap_preformatted(source_line, self.theme.code_style, avail) {
                let mut spans = self.prefix_spans(false);
                spans.push(Span::raw(" ".repeat(CODE_INDENT)));
                spans.push(chunk);
                self.lines.push(Line::from(spans));
            }
        }
    }

    fn push_text(&mut self, text: String) {
        self.current.push(Span::styled(text, self.style()));
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn content_indent(&self) -> usize {
        self.lists.last().map_or(0, |level| level.content_indent)
    }

    fn quote_prefix(&self) -> String {
        QUOTE_BAR.repeat(self.quote_depth)
    }

    /// Leading spans for a line; `first` consumes the pending list marker.
    fn prefix_spans(&mut self, first: bool) -> Vec<Span<'static>> {
        let mut spans = Vec::new();
        if self.quote_depth > 0 {
            spans.push(Span::styled(self.quote_prefix(), self.theme.blockquote_style));
        }
        let marker = if first { self.pending_marker.take() } else { None };
        match marker {
            Some(PendingMarker { indent, marker }) => {
                if indent > 0 {
                    spans.push(Span::raw(" ".repeat(indent)));
                }
                spans.push(Span::styled(marker, self.theme.list_marker_style));
            }
            None => {
                let indent = self.content_indent();
                if indent > 0 {
                    spans.push(Span::raw(" ".repeat(indent)));
                }
            }
        }
        spans
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current);
        let used = self.quote_prefix().width() + self.content_indent();
        let avail = self.width.saturating_sub(used).max(1);
        for (index, wrapped) in wrap_spans(&spans, avail).into_iter().enumerate() {
            let mut line = self.prefix_spans(index == 0);
            line.extend(wrapped);
            self.lines.push(Line::from(line));
        }
    }

    fn push_blank(&mut self) {
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }
}
