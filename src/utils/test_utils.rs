use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::api::{
    ChatSession, DownloadOptions, Gem, ModelOutput, RemoteClient, SessionMetadata, UploadedFile,
};
use crate::core::app::{apply_action, App, AppAction, AppCommand, AppInit, TaskResult};
use crate::core::error::{ChatError, ErrorKind};
use crate::core::export::{render_json, render_markdown};
use crate::core::history::{
    Conversation, ConversationSummary, FullHistoryStore, HistoryError, HistoryHandle,
    HistoryStore, StoredMessage,
};
use crate::core::message::ChatEntry;
use crate::core::persona::PersonaStore;
use crate::tools::{Tool, ToolArgs, ToolExecutor, ToolRegistry};
use crate::ui::theme::Theme;

pub const TEST_MODEL: &str = "test-model";

/// Scripted chat session. Replies are served in order, then `"ok"`.
pub struct FakeSession {
    replies: Mutex<VecDeque<ModelOutput>>,
    prompts: Mutex<Vec<String>>,
    metadata: Mutex<SessionMetadata>,
    gem: Mutex<Option<String>>,
    model: Mutex<String>,
    last: Mutex<Option<ModelOutput>>,
}

impl FakeSession {
    pub fn new() -> Arc<Self> {
        Self::with_replies(Vec::new())
    }

    pub fn with_replies(replies: Vec<ModelOutput>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            metadata: Mutex::new(SessionMetadata::default()),
            gem: Mutex::new(None),
            model: Mutex::new(TEST_MODEL.to_string()),
            last: Mutex::new(None),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn gem(&self) -> Option<String> {
        self.gem.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSession for FakeSession {
    async fn send_message(
        &self,
        prompt: &str,
        _files: &[UploadedFile],
    ) -> Result<ModelOutput, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        {
            let mut metadata = self.metadata.lock().unwrap();
            if metadata.cid.is_empty() {
                *metadata = SessionMetadata::new("c1", "r1", "rc1");
            }
        }
        let output = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ModelOutput {
                text: "ok".into(),
                ..ModelOutput::default()
            });
        *self.last.lock().unwrap() = Some(output.clone());
        Ok(output)
    }

    fn metadata(&self) -> SessionMetadata {
        self.metadata.lock().unwrap().clone()
    }

    fn set_metadata(&self, metadata: SessionMetadata) {
        *self.metadata.lock().unwrap() = metadata;
    }

    fn set_gem(&self, gem_id: Option<String>) {
        *self.gem.lock().unwrap() = gem_id;
    }

    fn model(&self) -> String {
        self.model.lock().unwrap().clone()
    }

    fn set_model(&self, model: &str) {
        *self.model.lock().unwrap() = model.to_string();
    }

    fn last_output(&self) -> Option<ModelOutput> {
        self.last.lock().unwrap().clone()
    }

    fn choose_candidate(&self, index: usize) -> Result<ModelOutput, ChatError> {
        match (index, self.last_output()) {
            (0, Some(output)) => Ok(output),
            _ => Err(ChatError::validation(format!(
                "candidate {} does not exist",
                index + 1
            ))),
        }
    }
}

/// Remote client backed by a [`FakeSession`]; downloads write placeholder files.
pub struct FakeRemote {
    pub session: Arc<FakeSession>,
    pub gems: Vec<Gem>,
}

impl FakeRemote {
    pub fn new(gems: Vec<Gem>) -> Self {
        Self {
            session: FakeSession::new(),
            gems,
        }
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn start_chat(&self) -> Result<Arc<dyn ChatSession>, ChatError> {
        Ok(self.session.clone())
    }

    async fn fetch_gems(&self, include_hidden: bool) -> Result<Vec<Gem>, ChatError> {
        Ok(self
            .gems
            .iter()
            .filter(|gem| include_hidden || !gem.predefined)
            .cloned()
            .collect())
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadedFile, ChatError> {
        if !path.is_file() {
            return Err(ChatError::new(
                ErrorKind::Upload,
                format!("file not found: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(UploadedFile {
            id: format!("upload-{name}"),
            name,
        })
    }

    async fn download_selected_images(
        &self,
        output: &ModelOutput,
        indices: &[usize],
        options: &DownloadOptions,
    ) -> Result<Vec<PathBuf>, ChatError> {
        let mut paths = Vec::new();
        for &index in indices {
            let Some(image) = output.images.get(index) else {
                continue;
            };
            let path = options.directory.join(format!("image_{}.png", index + 1));
            std::fs::write(&path, image.url.as_bytes())
                .map_err(|err| ChatError::new(ErrorKind::Network, err.to_string()))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// In-memory full history store; conversations are kept in display order.
#[derive(Default)]
pub struct MemoryHistory {
    conversations: Mutex<Vec<Conversation>>,
    next_id: AtomicUsize,
}

impl MemoryHistory {
    fn modify<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Conversation) -> T,
    ) -> Result<T, HistoryError> {
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        conversation.updated_at = Utc::now();
        Ok(f(conversation))
    }

    fn position(&self, id: &str) -> Result<usize, HistoryError> {
        self.conversations
            .lock()
            .unwrap()
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }
}

impl HistoryStore for MemoryHistory {
    fn add_message(&self, conversation_id: &str, entry: &ChatEntry) -> Result<(), HistoryError> {
        self.modify(conversation_id, |c| {
            c.messages
                .push(StoredMessage::from_entry(entry, Some(Utc::now())))
        })
    }

    fn update_metadata(
        &self,
        conversation_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), HistoryError> {
        self.modify(conversation_id, |c| c.metadata = metadata.clone())
    }

    fn update_title(&self, conversation_id: &str, title: &str) -> Result<(), HistoryError> {
        self.modify(conversation_id, |c| c.title = title.to_string())
    }

    fn as_full(self: Arc<Self>) -> Option<Arc<dyn FullHistoryStore>> {
        Some(self)
    }
}

impl FullHistoryStore for MemoryHistory {
    fn list_conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError> {
        let conversations = self.conversations.lock().unwrap();
        let (mut favorites, rest): (Vec<_>, Vec<_>) = conversations
            .iter()
            .map(Conversation::summary)
            .partition(|s| s.favorite);
        favorites.extend(rest);
        Ok(favorites)
    }

    fn get_conversation(&self, id: &str) -> Result<Conversation, HistoryError> {
        self.conversations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    fn create_conversation(&self, model: &str) -> Result<Conversation, HistoryError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let conversation = Conversation {
            id: format!("conv-{n}"),
            title: String::new(),
            model: model.to_string(),
            favorite: false,
            created_at: now,
            updated_at: now,
            metadata: SessionMetadata::default(),
            messages: Vec::new(),
        };
        self.conversations
            .lock()
            .unwrap()
            .insert(0, conversation.clone());
        Ok(conversation)
    }

    fn delete_conversation(&self, id: &str) -> Result<(), HistoryError> {
        let index = self.position(id)?;
        self.conversations.lock().unwrap().remove(index);
        Ok(())
    }

    fn toggle_favorite(&self, id: &str) -> Result<bool, HistoryError> {
        self.modify(id, |c| {
            c.favorite = !c.favorite;
            c.favorite
        })
    }

    fn export_to_markdown(&self, id: &str) -> Result<String, HistoryError> {
        let conversation = self.get_conversation(id)?;
        Ok(render_markdown(&conversation.title, &conversation.messages))
    }

    fn export_to_json(&self, id: &str) -> Result<String, HistoryError> {
        let conversation = self.get_conversation(id)?;
        render_json(&conversation.title, &conversation.messages).map_err(|source| {
            HistoryError::Parse {
                path: PathBuf::from(id),
                source,
            }
        })
    }

    fn swap_conversations(&self, first: &str, second: &str) -> Result<(), HistoryError> {
        let a = self.position(first)?;
        let b = self.position(second)?;
        self.conversations.lock().unwrap().swap(a, b);
        Ok(())
    }
}

/// A store that can only record turns.
#[derive(Default)]
pub struct MinimalHistory {
    pub recorded: Mutex<Vec<(String, ChatEntry)>>,
}

impl HistoryStore for MinimalHistory {
    fn add_message(&self, conversation_id: &str, entry: &ChatEntry) -> Result<(), HistoryError> {
        self.recorded
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), entry.clone()));
        Ok(())
    }

    fn update_metadata(&self, _: &str, _: &SessionMetadata) -> Result<(), HistoryError> {
        Ok(())
    }

    fn update_title(&self, _: &str, _: &str) -> Result<(), HistoryError> {
        Ok(())
    }
}

/// Returns its `x` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the argument back"
    }

    fn usage(&self) -> &str {
        r#"{"x": "<text>"}"#
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        false
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, String> {
        args.get("x")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "missing x".to_string())
    }
}

/// Never finishes in test time.
pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Sleeps for a minute"
    }

    fn usage(&self) -> &str {
        "{}"
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        false
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, String> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("woke".into())
    }
}

/// Requires confirmation and counts how often it actually ran.
#[derive(Default)]
pub struct GuardedTool {
    pub runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for GuardedTool {
    fn name(&self) -> &str {
        "danger"
    }

    fn description(&self) -> &str {
        "Needs approval"
    }

    fn usage(&self) -> &str {
        r#"{"x": "<text>"}"#
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        true
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok("done".into())
    }
}

fn build_app(
    chat: Arc<dyn ChatSession>,
    history: Option<HistoryHandle>,
    tools: ToolRegistry,
) -> App {
    App::new(AppInit {
        chat,
        history,
        tools: Arc::new(tools),
        personas: PersonaStore::load_from(
            Vec::new(),
            PathBuf::from("/nonexistent/geminiweb-personas"),
        ),
        theme: Theme::dark_default(),
        markdown: true,
        auto_approve: false,
        download_dir: std::env::temp_dir().join("geminiweb-test-downloads"),
    })
}

pub fn create_test_app() -> App {
    create_test_app_with_session(FakeSession::new())
}

pub fn create_test_app_with_session(session: Arc<FakeSession>) -> App {
    build_app(session, None, ToolRegistry::new())
}

pub fn create_test_app_with_history(history: Arc<MemoryHistory>) -> App {
    build_app(
        FakeSession::new(),
        Some(HistoryHandle::probe(history)),
        ToolRegistry::new(),
    )
}

pub fn create_test_app_with_tools(session: Arc<FakeSession>, tools: ToolRegistry) -> App {
    build_app(session, None, tools)
}

/// Resolve commands inline until the loop goes quiet. Ticks and UI-only
/// commands are dropped.
pub async fn drive(app: &mut App, commands: Vec<AppCommand>) {
    let executor = ToolExecutor::new(app.tools.clone(), Duration::from_secs(5), 64 * 1024);
    let cancel = CancellationToken::new();
    let mut queue: VecDeque<AppCommand> = commands.into();

    while let Some(command) = queue.pop_front() {
        let result = match command {
            AppCommand::SendMessage {
                request_id,
                prompt,
                attachments,
            } => {
                let chat = app.session.chat.clone();
                match chat.send_message(&prompt, &attachments).await {
                    Ok(output) => TaskResult::Response { request_id, output },
                    Err(error) => TaskResult::Error { request_id, error },
                }
            }
            AppCommand::RunTool(call) => {
                TaskResult::ToolExecuted(executor.execute(&cancel, call).await)
            }
            AppCommand::Deliver(result) => result,
            _ => continue,
        };
        queue.extend(apply_action(app, AppAction::Task(result)));
    }
}
