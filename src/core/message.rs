use serde::{Deserialize, Serialize};

use crate::api::WebImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    User,
    Assistant,
    Tool,
}

impl EntryRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryRole::User => "user",
            EntryRole::Assistant => "assistant",
            EntryRole::Tool => "tool",
        }
    }

    /// Heading used when a transcript is rendered or exported.
    pub fn speaker(self) -> &'static str {
        match self {
            EntryRole::User => "User",
            EntryRole::Assistant => "Gemini",
            EntryRole::Tool => "Tool",
        }
    }

    pub fn is_user(self) -> bool {
        self == EntryRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == EntryRole::Assistant
    }
}

impl AsRef<str> for EntryRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for EntryRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(EntryRole::User),
            "assistant" | "model" => Ok(EntryRole::Assistant),
            "tool" => Ok(EntryRole::Tool),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One entry in the chat log. Entries are never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: EntryRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<WebImage>,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(EntryRole::User, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::text(EntryRole::Tool, content)
    }

    pub fn assistant(
        content: impl Into<String>,
        thoughts: Option<String>,
        images: Vec<WebImage>,
    ) -> Self {
        Self {
            role: EntryRole::Assistant,
            content: content.into(),
            thoughts,
            images,
        }
    }

    fn text(role: EntryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            thoughts: None,
            images: Vec::new(),
        }
    }
}
