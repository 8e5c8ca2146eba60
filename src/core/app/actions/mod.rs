mod chat;
mod input;
mod io;
mod picker;
mod tool_calls;

use std::path::PathBuf;
use std::sync::Arc;

use ratatui::crossterm::event::KeyEvent;
use tokio::sync::mpsc;
use tracing::debug;

use super::App;
use crate::api::{DownloadOptions, Gem, ModelOutput, UploadedFile};
use crate::core::error::ChatError;
use crate::core::export::{ExportFormat, ExportTarget};
use crate::core::history::{
    Conversation, ConversationSummary, FullHistoryStore, StoredMessage,
};
use crate::tools::{ToolCall, ToolResult};

pub(crate) use input::{cancel_loading, submit_text};

pub enum AppAction {
    Resize { width: u16, height: u16 },
    Key(KeyEvent),
    /// Bracketed paste; sanitised before it reaches the input.
    Paste(String),
    Tick,
    Task(TaskResult),
}

/// Completion of a deferred task; every task yields exactly one.
#[derive(Debug)]
pub enum TaskResult {
    Response {
        request_id: u64,
        output: ModelOutput,
    },
    Error {
        request_id: u64,
        error: ChatError,
    },
    GemsLoaded(Result<Vec<Gem>, ChatError>),
    HistoryLoaded(Result<Vec<ConversationSummary>, ChatError>),
    ConversationLoaded(Result<Conversation, ChatError>),
    ManagerClosed(Result<Option<String>, ChatError>),
    FileUploaded(Result<UploadedFile, ChatError>),
    ExportResult(Result<ExportOutcome, ChatError>),
    DownloadResult(Result<DownloadOutcome, ChatError>),
    ToolExecuted(ToolResult),
    InitialPrompt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub overwritten: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub paths: Vec<PathBuf>,
    pub directory: PathBuf,
}

pub enum ExportSource {
    /// A persisted conversation, rendered by the store.
    Stored {
        store: Arc<dyn FullHistoryStore>,
        id: String,
    },
    /// The in-memory log.
    Log {
        title: String,
        messages: Vec<StoredMessage>,
    },
}

pub struct ExportRequest {
    pub target: ExportTarget,
    pub source: ExportSource,
}

/// Deferred work requested by Update. Executors resolve each into one [`TaskResult`].
pub enum AppCommand {
    SendMessage {
        request_id: u64,
        prompt: String,
        attachments: Vec<UploadedFile>,
    },
    ScheduleTick,
    LoadGems,
    LoadHistory {
        store: Arc<dyn FullHistoryStore>,
    },
    LoadConversation {
        store: Arc<dyn FullHistoryStore>,
        id: String,
    },
    RunHistoryManager {
        store: Arc<dyn FullHistoryStore>,
    },
    UploadFile {
        path: PathBuf,
    },
    Export(ExportRequest),
    DownloadImages {
        output: ModelOutput,
        indices: Vec<usize>,
        options: DownloadOptions,
    },
    RunTool(ToolCall),
    /// Result computed synchronously; fed straight back into the loop.
    Deliver(TaskResult),
}

impl AppCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AppCommand::SendMessage { .. } => "send_message",
            AppCommand::ScheduleTick => "schedule_tick",
            AppCommand::LoadGems => "load_gems",
            AppCommand::LoadHistory { .. } => "load_history",
            AppCommand::LoadConversation { .. } => "load_conversation",
            AppCommand::RunHistoryManager { .. } => "run_history_manager",
            AppCommand::UploadFile { .. } => "upload_file",
            AppCommand::Export(_) => "export",
            AppCommand::DownloadImages { .. } => "download_images",
            AppCommand::RunTool(_) => "run_tool",
            AppCommand::Deliver(_) => "deliver",
        }
    }
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppAction>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppAction>) -> Self {
        Self { tx }
    }

    pub fn dispatch(&self, action: AppAction) {
        let _ = self.tx.send(action);
    }

    pub fn task(&self, result: TaskResult) {
        self.dispatch(AppAction::Task(result));
    }
}

pub fn apply_actions(app: &mut App, actions: impl IntoIterator<Item = AppAction>) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for action in actions {
        commands.extend(apply_action(app, action));
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction) -> Vec<AppCommand> {
    match action {
        AppAction::Resize { width, height } => {
            app.ui.resize(width, height);
            Vec::new()
        }
        AppAction::Key(key) => input::handle_key(app, key),
        AppAction::Paste(text) => {
            input::handle_paste(app, &text);
            Vec::new()
        }
        AppAction::Tick => handle_tick(app),
        AppAction::Task(result) => apply_task_result(app, result),
    }
}

fn apply_task_result(app: &mut App, result: TaskResult) -> Vec<AppCommand> {
    match result {
        TaskResult::Response { request_id, output } => chat::handle_response(app, request_id, output),
        TaskResult::Error { request_id, error } => {
            chat::handle_send_error(app, request_id, error);
            Vec::new()
        }
        TaskResult::ToolExecuted(result) => tool_calls::handle_tool_executed(app, result),
        TaskResult::InitialPrompt(prompt) => submit_text(app, &prompt),
        TaskResult::GemsLoaded(result) => {
            picker::handle_gems_loaded(app, result);
            Vec::new()
        }
        TaskResult::HistoryLoaded(result) => {
            picker::handle_history_loaded(app, result);
            Vec::new()
        }
        TaskResult::ConversationLoaded(result) => {
            io::handle_conversation_loaded(app, result);
            Vec::new()
        }
        TaskResult::ManagerClosed(result) => io::handle_manager_closed(app, result),
        TaskResult::FileUploaded(result) => {
            io::handle_file_uploaded(app, result);
            Vec::new()
        }
        TaskResult::ExportResult(result) => {
            io::handle_export_result(app, result);
            Vec::new()
        }
        TaskResult::DownloadResult(result) => {
            io::handle_download_result(app, result);
            Vec::new()
        }
    }
}

fn handle_tick(app: &mut App) -> Vec<AppCommand> {
    app.ui.tick_scheduled = false;
    if !app.ui.loading {
        return Vec::new();
    }
    app.ui.frame = app.ui.frame.wrapping_add(1);
    schedule_tick(app).into_iter().collect()
}

/// One pending tick at a time, only while loading.
pub(crate) fn schedule_tick(app: &mut App) -> Option<AppCommand> {
    if !app.ui.loading || app.ui.tick_scheduled {
        return None;
    }
    app.ui.tick_scheduled = true;
    debug!(frame = app.ui.frame, "Scheduling animation tick");
    Some(AppCommand::ScheduleTick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::create_test_app;

    #[test]
    fn ticks_advance_only_while_loading() {
        let mut app = create_test_app();
        assert!(apply_action(&mut app, AppAction::Tick).is_empty());
        assert_eq!(app.ui.frame, 0);

        app.ui.loading = true;
        let commands = apply_action(&mut app, AppAction::Tick);
        assert_eq!(app.ui.frame, 1);
        assert!(matches!(commands.as_slice(), [AppCommand::ScheduleTick]));
        assert!(schedule_tick(&mut app).is_none());
    }

    #[test]
    fn resize_updates_viewport() {
        let mut app = create_test_app();
        apply_action(
            &mut app,
            AppAction::Resize {
                width: 120,
                height: 50,
            },
        );
        assert_eq!(app.ui.viewport_height(), 36);
        assert_eq!(app.ui.content_width(), 116);
    }

    #[test]
    fn batched_actions_apply_in_order() {
        let mut app = create_test_app();
        let commands = apply_actions(
            &mut app,
            vec![
                AppAction::Resize {
                    width: 120,
                    height: 50,
                },
                AppAction::Task(TaskResult::InitialPrompt("queued".into())),
                AppAction::Paste("typed while busy".into()),
            ],
        );
        assert_eq!(app.ui.content_width(), 116);
        assert!(commands
            .iter()
            .any(|c| matches!(c, AppCommand::SendMessage { prompt, .. } if prompt == "queued")));
        assert!(app.ui.loading);
        assert_eq!(app.ui.input_text(), "");
    }
}
