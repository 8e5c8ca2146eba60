//! HTTP implementation of the remote surface.
//!
//! Talks to a JSON relay in front of the web service:
//! `POST /v1/chat`, `GET /v1/gems`, and `POST /v1/upload`. Images are fetched
//! directly from their URLs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{
    ChatSession, DownloadOptions, Gem, ModelOutput, RemoteClient, SessionMetadata, UploadedFile,
    WebImage,
};
use crate::core::error::{ChatError, ErrorKind};

const CHAT_ENDPOINT: &str = "/v1/chat";
const GEMS_ENDPOINT: &str = "/v1/gems";
const UPLOAD_ENDPOINT: &str = "/v1/upload";

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub default_model: String,
}

/// Shared reqwest client plus connection settings.
#[derive(Clone)]
pub struct WebClient {
    http: reqwest::Client,
    settings: Arc<RemoteSettings>,
}

impl WebClient {
    pub fn new(settings: RemoteSettings) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ChatError::new(ErrorKind::Network, err.to_string()))?;
        Ok(Self {
            http,
            settings: Arc::new(settings),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.token {
            Some(token) if !token.is_empty() => {
                request.header("Authorization", format!("Bearer {token}"))
            }
            _ => request,
        }
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ChatError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| transport_error(err, endpoint))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport_error(err, endpoint))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), endpoint, &body));
        }

        serde_json::from_str(&body).map_err(|err| {
            ChatError::new(ErrorKind::Network, format!("malformed response: {err}"))
                .with_status(status.as_u16())
                .with_endpoint(endpoint)
                .with_body(body)
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gem: Option<&'a str>,
    #[serde(flatten)]
    metadata: &'a SessionMetadata,
    files: &'a [UploadedFile],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    thoughts: Option<String>,
    #[serde(default)]
    images: Vec<WebImage>,
    #[serde(flatten)]
    metadata: SessionMetadata,
    /// Alternative drafts of the same reply, the first being `text` itself.
    #[serde(default)]
    candidates: Vec<CandidateBody>,
}

#[derive(Deserialize)]
struct CandidateBody {
    rcid: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    thoughts: Option<String>,
    #[serde(default)]
    images: Vec<WebImage>,
}

#[derive(Deserialize)]
struct GemsResponse {
    #[serde(default)]
    gems: Vec<Gem>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn transport_error(err: reqwest::Error, endpoint: &str) -> ChatError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Network
    };
    let mut error = ChatError::new(kind, err.to_string()).with_endpoint(endpoint);
    if let Some(status) = err.status() {
        error = error.with_status(status.as_u16());
    }
    error
}

fn status_error(status: u16, endpoint: &str, body: &str) -> ChatError {
    let kind = match status {
        401 | 403 => ErrorKind::Auth,
        429 => ErrorKind::RateLimit,
        408 | 504 => ErrorKind::Timeout,
        _ => ErrorKind::Network,
    };

    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|env| env.error.message.clone())
        .unwrap_or_else(|| format!("request failed with status {status}"));

    let mut error = ChatError::new(kind, message)
        .with_status(status)
        .with_endpoint(endpoint)
        .with_body(body);
    if let Some(env) = parsed {
        if let Some(code) = env.error.code {
            error = error.with_code(code, env.error.name);
        }
    }
    error
}

#[async_trait]
impl RemoteClient for WebClient {
    async fn start_chat(&self) -> Result<Arc<dyn ChatSession>, ChatError> {
        Ok(Arc::new(WebSession::new(
            self.clone(),
            self.settings.default_model.clone(),
        )))
    }

    async fn fetch_gems(&self, include_hidden: bool) -> Result<Vec<Gem>, ChatError> {
        let request = self
            .http
            .get(self.url(GEMS_ENDPOINT))
            .query(&[("include_hidden", include_hidden)]);
        let response: GemsResponse = self.send_json(request, GEMS_ENDPOINT).await?;
        debug!(count = response.gems.len(), "Fetched gems");
        Ok(response.gems)
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadedFile, ChatError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ChatError::new(
                ErrorKind::Upload,
                format!("cannot read {}: {err}", path.display()),
            )
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let request = self
            .http
            .post(self.url(UPLOAD_ENDPOINT))
            .query(&[("name", name.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(bytes);

        let uploaded: UploadedFile = self
            .send_json(request, UPLOAD_ENDPOINT)
            .await
            .map_err(|err| match err.kind {
                ErrorKind::Network => ChatError {
                    kind: ErrorKind::Upload,
                    ..err
                },
                _ => err,
            })?;
        debug!(file = %uploaded.name, id = %uploaded.id, "Uploaded file");
        Ok(uploaded)
    }

    async fn download_selected_images(
        &self,
        output: &ModelOutput,
        indices: &[usize],
        options: &DownloadOptions,
    ) -> Result<Vec<PathBuf>, ChatError> {
        tokio::fs::create_dir_all(&options.directory)
            .await
            .map_err(|err| {
                ChatError::new(
                    ErrorKind::Persistence,
                    format!("cannot create {}: {err}", options.directory.display()),
                )
            })?;

        let mut saved = Vec::with_capacity(indices.len());
        for &index in indices {
            let image = output.images.get(index).ok_or_else(|| {
                ChatError::validation(format!("image {} does not exist", index + 1))
            })?;
            let url = image_url(&image.url, options.full_size);
            let target = options.directory.join(image_file_name(image, index));
            self.download_to(&url, &target).await?;
            debug!(url = %url, path = %target.display(), "Saved image");
            saved.push(target);
        }
        Ok(saved)
    }
}

impl WebClient {
    async fn download_to(&self, url: &str, target: &Path) -> Result<(), ChatError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| transport_error(err, url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), url, ""));
        }

        let write_error = |err: std::io::Error| {
            ChatError::new(
                ErrorKind::Persistence,
                format!("cannot write {}: {err}", target.display()),
            )
        };
        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(write_error)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| transport_error(err, url))?;
            file.write_all(&chunk).await.map_err(write_error)?;
        }
        file.flush().await.map_err(write_error)?;
        Ok(())
    }
}

/// Full-resolution variant of hosted image URLs.
pub(crate) fn image_url(url: &str, full_size: bool) -> String {
    if full_size && url.contains("googleusercontent.com") && !url.contains("=s") {
        format!("{url}=s2048")
    } else {
        url.to_string()
    }
}

pub(crate) fn image_file_name(image: &WebImage, index: usize) -> String {
    let stem: String = image
        .title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        format!("image_{}.png", index + 1)
    } else {
        format!("{stem}_{}.png", index + 1)
    }
}

struct Candidate {
    rcid: String,
    output: ModelOutput,
}

struct SessionState {
    metadata: SessionMetadata,
    gem: Option<String>,
    model: String,
    last_output: Option<ModelOutput>,
    candidates: Vec<Candidate>,
}

impl SessionState {
    fn apply_response(&mut self, response: ChatResponse) -> ModelOutput {
        let output = ModelOutput {
            text: response.text,
            thoughts: response.thoughts,
            images: response.images,
        };
        if !response.metadata.is_empty() {
            self.metadata = response.metadata;
        }
        self.candidates = if response.candidates.is_empty() {
            vec![Candidate {
                rcid: self.metadata.rcid.clone(),
                output: output.clone(),
            }]
        } else {
            response
                .candidates
                .into_iter()
                .map(|c| Candidate {
                    rcid: c.rcid,
                    output: ModelOutput {
                        text: c.text,
                        thoughts: c.thoughts,
                        images: c.images,
                    },
                })
                .collect()
        };
        self.last_output = Some(output.clone());
        output
    }

    fn choose(&mut self, index: usize) -> Result<ModelOutput, ChatError> {
        let candidate = self.candidates.get(index).ok_or_else(|| {
            ChatError::validation(format!(
                "candidate {} does not exist ({} available)",
                index + 1,
                self.candidates.len()
            ))
        })?;
        let output = candidate.output.clone();
        self.metadata.rcid = candidate.rcid.clone();
        self.last_output = Some(output.clone());
        Ok(output)
    }
}

pub struct WebSession {
    client: WebClient,
    state: Mutex<SessionState>,
}

impl WebSession {
    fn new(client: WebClient, model: String) -> Self {
        Self {
            client,
            state: Mutex::new(SessionState {
                metadata: SessionMetadata::default(),
                gem: None,
                model,
                last_output: None,
                candidates: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatSession for WebSession {
    async fn send_message(
        &self,
        prompt: &str,
        files: &[UploadedFile],
    ) -> Result<ModelOutput, ChatError> {
        let (metadata, gem, model) = {
            let state = self.state();
            (state.metadata.clone(), state.gem.clone(), state.model.clone())
        };

        let body = ChatRequest {
            prompt,
            model: &model,
            gem: gem.as_deref(),
            metadata: &metadata,
            files,
        };
        let request = self
            .client
            .http
            .post(self.client.url(CHAT_ENDPOINT))
            .json(&body);

        debug!(model = %model, files = files.len(), cid = %metadata.cid, "Sending chat message");
        let response: ChatResponse = self.client.send_json(request, CHAT_ENDPOINT).await?;

        Ok(self.state().apply_response(response))
    }

    fn metadata(&self) -> SessionMetadata {
        self.state().metadata.clone()
    }

    fn set_metadata(&self, metadata: SessionMetadata) {
        self.state().metadata = metadata;
    }

    fn set_gem(&self, gem_id: Option<String>) {
        self.state().gem = gem_id;
    }

    fn model(&self) -> String {
        self.state().model.clone()
    }

    fn set_model(&self, model: &str) {
        self.state().model = model.to_string();
    }

    fn last_output(&self) -> Option<ModelOutput> {
        self.state().last_output.clone()
    }

    fn choose_candidate(&self, index: usize) -> Result<ModelOutput, ChatError> {
        self.state().choose(index)
    }
}
