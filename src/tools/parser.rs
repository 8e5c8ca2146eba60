use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ToolArgs, ToolCall, ToolResult};

const RESULT_FENCE: &str = "tool_result";

#[derive(Deserialize)]
struct RawToolCall {
    name: String,
    #[serde(default, alias = "arguments")]
    args: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
}

fn is_tool_fence(info: &str) -> bool {
    let tag = info
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .replace("\\_", "_")
        .to_ascii_lowercase();
    tag == "tool_call" || tag == "tool"
}

fn parse_call(body: &str) -> Option<ToolCall> {
    let raw: RawToolCall = serde_json::from_str(body.trim()).ok()?;
    let name = raw.name.trim();
    if name.is_empty() {
        return None;
    }
    let args = match raw.args {
        None | Some(Value::Null) => ToolArgs::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return None,
    };
    Some(ToolCall {
        name: name.to_string(),
        args,
        reason: raw.reason.unwrap_or_default(),
    })
}

/// Split a model reply into tool calls and the remaining narrative text.
///
/// Blocks that do not parse as a tool call stay in the text untouched.
pub fn extract_tool_calls(text: &str) -> (Vec<ToolCall>, String) {
    let mut calls = Vec::new();
    let mut removed: Vec<Range<usize>> = Vec::new();

    let mut current: Option<(Range<usize>, String)> = None;
    for (event, range) in Parser::new(text).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if is_tool_fence(&info) => {
                current = Some((range, String::new()));
            }
            Event::Text(body) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&body);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((block, body)) = current.take() {
                    if let Some(call) = parse_call(&body) {
                        calls.push(call);
                        removed.push(block);
                    }
                }
            }
            _ => {}
        }
    }

    if calls.is_empty() {
        return (calls, text.to_string());
    }

    let mut cleaned = String::with_capacity(text.len());
    let mut cursor = 0;
    for range in removed {
        cleaned.push_str(&text[cursor..range.start]);
        cursor = range.end;
    }
    cleaned.push_str(&text[cursor..]);
    (calls, collapse_blank_lines(&cleaned))
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[derive(Serialize)]
struct ResultPayload<'a> {
    name: &'a str,
    success: bool,
    output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    truncated: bool,
}

/// Canonical `tool_result` block fed back to the model.
pub fn format_tool_result(result: &ToolResult) -> String {
    let payload = ResultPayload {
        name: &result.call.name,
        success: result.success(),
        output: &result.output,
        error: result.error.as_deref(),
        truncated: result.truncated,
    };
    let json = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
    format!("```{RESULT_FENCE}\n{json}\n```")
}

/// Result blocks in call order, separated by a blank line.
pub fn format_tool_batch(blocks: &[String]) -> String {
    blocks.join("\n\n")
}
