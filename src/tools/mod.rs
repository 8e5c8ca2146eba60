//! Local tools the model can ask the client to run.
//!
//! The model requests a tool by embedding a fenced `tool_call` block in its
//! reply ([`parser`]); the chat loop executes the calls one at a time through
//! [`executor::ToolExecutor`] and feeds `tool_result` blocks back as the next
//! prompt.

pub mod builtin;
pub mod executor;
pub mod parser;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub use executor::ToolExecutor;
pub use parser::{extract_tool_calls, format_tool_batch, format_tool_result};

pub type ToolArgs = Map<String, Value>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// One-line argument synopsis shown to the model.
    fn usage(&self) -> &str;

    fn requires_confirmation(&self, args: &ToolArgs) -> bool;

    async fn execute(&self, args: &ToolArgs) -> Result<String, String>;
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: ToolArgs,
    pub reason: String,
}

impl ToolCall {
    pub fn args_json(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call: ToolCall,
    pub output: String,
    pub truncated: bool,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ToolResult {
    pub fn failure(call: ToolCall, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            call,
            output: String::new(),
            truncated: false,
            error: Some(error.into()),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn denied(call: ToolCall) -> Self {
        Self::failure(call, "user denied")
    }

    pub fn unknown(call: ToolCall) -> Self {
        let message = format!("unknown tool: {}", call.name);
        Self::failure(call, message)
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Transcript entry for this result.
    pub fn summary(&self) -> String {
        let mut text = format!("**{}**", self.call.name);
        if !self.call.reason.trim().is_empty() {
            text.push_str(": ");
            text.push_str(self.call.reason.trim());
        }
        text.push_str(&format!("\n\nArgs: `{}`\n\n", self.call.args_json()));
        match &self.error {
            Some(error) => text.push_str(&format!("Error: {error}")),
            None => {
                text.push_str("```\n");
                text.push_str(self.output.trim_end());
                text.push_str("\n```");
                if self.truncated {
                    text.push_str("\n(output truncated)");
                }
            }
        }
        text
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(builtin::ReadFile));
        registry.register(Arc::new(builtin::ListDirectory));
        registry.register(Arc::new(builtin::WriteFile));
        registry.register(Arc::new(builtin::RunCommand));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Preamble that teaches the model the tool-call grammar.
    pub fn instructions(&self) -> String {
        let mut text = String::from(
            "[Tools]\nYou can ask the client to run local tools. To call one, reply with a fenced \
             block tagged tool_call containing JSON:\n```tool_call\n{\"name\": \"<tool>\", \
             \"args\": {...}, \"reason\": \"<why>\"}\n```\nResults come back in tool_result \
             blocks. Available tools:\n",
        );
        for tool in self.iter() {
            text.push_str(&format!(
                "- {} {}: {}\n",
                tool.name(),
                tool.usage(),
                tool.description()
            ));
        }
        text
    }
}
