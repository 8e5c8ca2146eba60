use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::path::{app_dir, expand_tilde};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8765";
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOOL_OUTPUT_BYTES: usize = 16 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Register the built-in tools with the session
    pub enabled: Option<bool>,
    /// Tool output beyond this many bytes is truncated
    pub max_output_bytes: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// A persona defined inline in the config file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Model selected when a session starts
    pub default_model: Option<String>,
    /// Where `/save` writes images and `/persona export` writes personas
    pub download_dir: Option<String>,
    /// Directory holding saved conversations
    pub history_dir: Option<String>,
    /// UI theme name ("dark" or "light")
    pub theme: Option<String>,
    /// Enable markdown rendering in the chat area
    pub markdown: Option<bool>,
    /// Run tools that ask for confirmation without prompting
    pub auto_approve_tools: Option<bool>,
    /// Persona activated at startup
    pub persona: Option<String>,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub tools: Option<ToolsConfig>,
    #[serde(default)]
    pub personas: Vec<PersonaConfig>,
}

impl Config {
    pub fn model(&self) -> String {
        self.default_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn markdown_enabled(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn auto_approve(&self) -> bool {
        self.auto_approve_tools.unwrap_or(false)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| app_dir().join("images"))
    }

    /// `<download_dir>/personas`, or `~/.geminiweb/personas` when unset.
    pub fn persona_dir(&self) -> PathBuf {
        match self.download_dir.as_deref() {
            Some(dir) => expand_tilde(dir).join("personas"),
            None => app_dir().join("personas"),
        }
    }

    pub fn history_dir(&self) -> PathBuf {
        self.history_dir
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| app_dir().join("history"))
    }

    pub fn base_url(&self) -> String {
        self.remote
            .as_ref()
            .and_then(|r| r.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn token(&self) -> Option<String> {
        self.remote.as_ref().and_then(|r| r.token.clone())
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(
            self.remote
                .as_ref()
                .and_then(|r| r.timeout_secs)
                .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS),
        )
    }

    pub fn tools_enabled(&self) -> bool {
        self.tools.as_ref().and_then(|t| t.enabled).unwrap_or(true)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(
            self.tools
                .as_ref()
                .and_then(|t| t.timeout_secs)
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
        )
    }

    pub fn tool_output_limit(&self) -> usize {
        self.tools
            .as_ref()
            .and_then(|t| t.max_output_bytes)
            .unwrap_or(DEFAULT_TOOL_OUTPUT_BYTES)
    }
}
