//! `/export` argument handling and transcript formats.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::core::error::ChatError;
use crate::core::history::StoredMessage;
use crate::utils::path::absolutize;

const MAX_FILENAME_CHARS: usize = 200;
const FALLBACK_FILENAME: &str = "conversation";
const BLOCK_SEPARATOR: &str = "\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Json => "JSON",
        }
    }
}

/// Parsed `/export` arguments before path resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportArgs {
    pub path: Option<String>,
    pub format: Option<ExportFormat>,
}

/// A fully resolved export target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub format: ExportFormat,
}

pub fn parse_export_args(args: &str) -> Result<ExportArgs, ChatError> {
    let mut parsed = ExportArgs::default();
    let mut tokens = args.split_whitespace();

    while let Some(token) = tokens.next() {
        match token {
            "-f" | "--format" => {
                let value = tokens
                    .next()
                    .ok_or_else(|| ChatError::validation("missing value for -f (json|md)"))?;
                let format = ExportFormat::parse(value).ok_or_else(|| {
                    ChatError::validation(format!("unknown export format: {value} (json|md)"))
                })?;
                parsed.format = Some(format);
            }
            other if parsed.path.is_none() => parsed.path = Some(other.to_string()),
            other => {
                return Err(ChatError::validation(format!(
                    "unexpected export argument: {other}"
                )))
            }
        }
    }
    Ok(parsed)
}

/// Replace characters that are unsafe in file names.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');
    let truncated: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    if truncated.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        truncated
    }
}

pub fn default_export_name(title: Option<&str>, now: DateTime<Local>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => format!("{}.md", sanitize_filename(title).replace(' ', "_")),
        None => format!("conversation_{}.md", now.format("%Y%m%d_%H%M%S")),
    }
}

pub fn resolve_export_target(
    args: &ExportArgs,
    title: Option<&str>,
    now: DateTime<Local>,
) -> Result<ExportTarget, ChatError> {
    let raw = args
        .path
        .clone()
        .unwrap_or_else(|| default_export_name(title, now));

    let (format, raw) = match args.format {
        Some(ExportFormat::Json) => (ExportFormat::Json, with_extension(raw, "json")),
        Some(ExportFormat::Markdown) => (ExportFormat::Markdown, with_extension(raw, "md")),
        None if has_extension(&raw, "json") => (ExportFormat::Json, raw),
        None => (ExportFormat::Markdown, with_extension(raw, "md")),
    };

    let path = absolutize(&raw)
        .map_err(|err| ChatError::validation(format!("cannot resolve {raw}: {err}")))?;
    match path.parent() {
        Some(parent) if parent.is_dir() => {}
        Some(parent) => {
            return Err(ChatError::not_found(format!(
                "directory does not exist: {}",
                parent.display()
            )))
        }
        None => return Err(ChatError::validation(format!("invalid export path: {raw}"))),
    }

    Ok(ExportTarget { path, format })
}

fn has_extension(raw: &str, ext: &str) -> bool {
    Path::new(raw)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn with_extension(raw: String, ext: &str) -> String {
    if has_extension(&raw, ext) {
        raw
    } else {
        format!("{raw}.{ext}")
    }
}

pub fn render_markdown(title: &str, messages: &[StoredMessage]) -> String {
    let title = if title.trim().is_empty() {
        "Conversation"
    } else {
        title
    };
    let blocks: Vec<String> = messages
        .iter()
        .map(|message| {
            let mut block = format!("**{}:**\n\n{}\n", message.role.speaker(), message.content);
            if let Some(thoughts) = message.thoughts.as_deref().filter(|t| !t.trim().is_empty()) {
                block.push_str("\n> ");
                block.push_str(&thoughts.replace('\n', "\n> "));
                block.push('\n');
            }
            block
        })
        .collect();
    format!("# {title}\n\n{}", blocks.join(BLOCK_SEPARATOR))
}

#[derive(Serialize)]
struct JsonTranscript<'a> {
    title: &'a str,
    messages: Vec<JsonMessage<'a>>,
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thoughts: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

pub fn render_json(title: &str, messages: &[StoredMessage]) -> Result<String, serde_json::Error> {
    let transcript = JsonTranscript {
        title,
        messages: messages
            .iter()
            .map(|m| JsonMessage {
                role: m.role.as_str(),
                content: &m.content,
                thoughts: m.thoughts.as_deref(),
                timestamp: m.timestamp.map(|t| t.to_rfc3339()),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&transcript)
}
