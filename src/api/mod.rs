//! Remote service surface consumed by the chat core.
//!
//! The loop only talks to the service through [`RemoteClient`] and
//! [`ChatSession`]; [`http`] provides the implementation used by the binary.

pub mod http;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::ChatError;

/// Conversation identifiers used by the service to resume a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub rid: String,
    #[serde(default)]
    pub rcid: String,
}

impl SessionMetadata {
    pub fn new(cid: impl Into<String>, rid: impl Into<String>, rcid: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            rid: rid.into(),
            rcid: rcid.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cid.is_empty() && self.rid.is_empty() && self.rcid.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebImage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub predefined: bool,
}

/// Handle returned by an upload; attached to the next send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
}

/// One model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOutput {
    pub text: String,
    pub thoughts: Option<String>,
    pub images: Vec<WebImage>,
}

impl ModelOutput {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn thoughts(&self) -> Option<&str> {
        self.thoughts.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn images(&self) -> &[WebImage] {
        &self.images
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub directory: PathBuf,
    pub full_size: bool,
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn start_chat(&self) -> Result<Arc<dyn ChatSession>, ChatError>;

    async fn fetch_gems(&self, include_hidden: bool) -> Result<Vec<Gem>, ChatError>;

    async fn upload_file(&self, path: &Path) -> Result<UploadedFile, ChatError>;

    async fn download_selected_images(
        &self,
        output: &ModelOutput,
        indices: &[usize],
        options: &DownloadOptions,
    ) -> Result<Vec<PathBuf>, ChatError>;
}

/// A live conversation with the service.
///
/// Implementations keep their own interior state; the loop mutates it only
/// through these methods and only from Update.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_message(
        &self,
        prompt: &str,
        files: &[UploadedFile],
    ) -> Result<ModelOutput, ChatError>;

    fn metadata(&self) -> SessionMetadata;

    fn set_metadata(&self, metadata: SessionMetadata);

    fn set_gem(&self, gem_id: Option<String>);

    fn model(&self) -> String;

    fn set_model(&self, model: &str);

    fn last_output(&self) -> Option<ModelOutput>;

    /// Make alternative `index` of the last reply current; the next send continues from it.
    fn choose_candidate(&self, index: usize) -> Result<ModelOutput, ChatError>;
}
