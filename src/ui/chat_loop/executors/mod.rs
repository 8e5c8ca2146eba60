//! Turns [`AppCommand`] descriptions into spawned work.
//!
//! Every resolved command yields exactly one [`AppAction`], dispatched back
//! into the loop. Task bodies never touch [`App`](crate::core::app::App).

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ChatSession, RemoteClient};
use crate::core::app::{
    AppAction, AppActionDispatcher, AppCommand, DownloadOutcome, ExportOutcome, ExportRequest,
    ExportSource, TaskResult,
};
use crate::core::error::{ChatError, ErrorKind};
use crate::core::export::{render_json, render_markdown, ExportFormat};
use crate::tools::ToolExecutor;
use crate::ui::loading::TICK_INTERVAL_MS;

#[derive(Clone)]
pub struct ExecutorContext {
    pub remote: Arc<dyn RemoteClient>,
    pub chat: Arc<dyn ChatSession>,
    pub tools: ToolExecutor,
    /// Cancelled when the loop abandons a round-trip or shuts down.
    pub cancel: CancellationToken,
    pub dispatcher: AppActionDispatcher,
}

impl ExecutorContext {
    pub fn spawn(&self, command: AppCommand) {
        let ctx = self.clone();
        let name = command.name();
        tokio::spawn(async move {
            match resolve(&ctx, command).await {
                Some(action) => ctx.dispatcher.dispatch(action),
                None => debug!(command = name, "Command produced no action"),
            }
        });
    }
}

/// Run one command to completion.
pub async fn resolve(ctx: &ExecutorContext, command: AppCommand) -> Option<AppAction> {
    let result = match command {
        AppCommand::ScheduleTick => {
            tokio::time::sleep(Duration::from_millis(TICK_INTERVAL_MS)).await;
            return Some(AppAction::Tick);
        }
        AppCommand::SendMessage {
            request_id,
            prompt,
            attachments,
        } => {
            debug!(request_id, attachments = attachments.len(), "Sending message");
            match ctx.chat.send_message(&prompt, &attachments).await {
                Ok(output) => TaskResult::Response { request_id, output },
                Err(error) => {
                    warn!(request_id, error = %error, "Send failed");
                    TaskResult::Error { request_id, error }
                }
            }
        }
        AppCommand::LoadGems => TaskResult::GemsLoaded(ctx.remote.fetch_gems(false).await),
        AppCommand::LoadHistory { store } => TaskResult::HistoryLoaded(
            blocking(move || store.list_conversations().map_err(ChatError::from)).await,
        ),
        AppCommand::LoadConversation { store, id } => TaskResult::ConversationLoaded(
            blocking(move || store.get_conversation(&id).map_err(ChatError::from)).await,
        ),
        AppCommand::UploadFile { path } => {
            TaskResult::FileUploaded(ctx.remote.upload_file(&path).await)
        }
        AppCommand::Export(request) => {
            TaskResult::ExportResult(blocking(move || export(request)).await)
        }
        AppCommand::DownloadImages {
            output,
            indices,
            options,
        } => {
            let result = async {
                tokio::fs::create_dir_all(&options.directory)
                    .await
                    .map_err(|err| {
                        ChatError::new(
                            ErrorKind::Persistence,
                            format!("cannot create {}: {err}", options.directory.display()),
                        )
                    })?;
                let paths = ctx
                    .remote
                    .download_selected_images(&output, &indices, &options)
                    .await?;
                info!(count = paths.len(), "Downloaded images");
                Ok::<_, ChatError>(DownloadOutcome {
                    paths,
                    directory: options.directory.clone(),
                })
            }
            .await;
            TaskResult::DownloadResult(result)
        }
        AppCommand::RunTool(call) => {
            TaskResult::ToolExecuted(ctx.tools.execute(&ctx.cancel, call).await)
        }
        AppCommand::Deliver(result) => result,
        AppCommand::RunHistoryManager { .. } => {
            // Needs the terminal; the loop driver runs it inline.
            warn!("History manager reached the executor");
            return None;
        }
    };
    Some(AppAction::Task(result))
}

/// Store and export bodies do synchronous file I/O.
async fn blocking<T, F>(body: F) -> Result<T, ChatError>
where
    F: FnOnce() -> Result<T, ChatError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(body).await.unwrap_or_else(|err| {
        Err(ChatError::new(
            ErrorKind::Persistence,
            format!("file task failed: {err}"),
        ))
    })
}

fn export(request: ExportRequest) -> Result<ExportOutcome, ChatError> {
    let format = request.target.format;
    let content = match request.source {
        ExportSource::Stored { store, id } => match format {
            ExportFormat::Markdown => store.export_to_markdown(&id)?,
            ExportFormat::Json => store.export_to_json(&id)?,
        },
        ExportSource::Log { title, messages } => match format {
            ExportFormat::Markdown => render_markdown(&title, &messages),
            ExportFormat::Json => render_json(&title, &messages).map_err(|err| {
                ChatError::new(ErrorKind::Persistence, format!("cannot encode transcript: {err}"))
            })?,
        },
    };

    let path = request.target.path;
    let overwritten = path.exists();
    write_atomically(&path, &content).map_err(|err| {
        ChatError::new(
            ErrorKind::Persistence,
            format!("cannot write {}: {err}", path.display()),
        )
    })?;
    info!(path = %path.display(), format = format.label(), overwritten, "Exported conversation");
    Ok(ExportOutcome {
        path,
        format,
        overwritten,
    })
}

fn write_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
