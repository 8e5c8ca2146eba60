use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AppCommand, DownloadOutcome, ExportOutcome};
use crate::api::{SessionMetadata, UploadedFile};
use crate::core::app::{App, ConversationRef, ViewState};
use crate::core::error::ChatError;
use crate::core::history::{Conversation, FullHistoryStore, StoredMessage};
use crate::utils::path::path_display;

/// Replace the session with a stored conversation.
fn open_conversation(app: &mut App, conversation: Conversation) {
    info!(conversation_id = %conversation.id, messages = conversation.messages.len(), "Opening conversation");
    app.session.messages = conversation
        .messages
        .iter()
        .map(StoredMessage::to_entry)
        .collect();
    app.session.chat.set_metadata(conversation.metadata.clone());
    if !conversation.model.trim().is_empty() {
        app.session.chat.set_model(&conversation.model);
    }
    app.session.last_output = None;
    app.session.attachments.clear();
    app.session.round_trip = None;
    app.view = ViewState::Chat;
    app.ui.scroll_to_bottom();

    let summary = conversation.summary();
    app.ui.set_notice(format!(
        "Loaded \"{}\" ({} messages)",
        summary.display_title(),
        summary.message_count
    ));
    app.session.conversation = Some(ConversationRef {
        id: conversation.id,
        title: conversation.title,
    });
}

/// Fresh conversation with empty remote metadata.
pub(super) fn start_new_conversation(app: &mut App) {
    app.session.messages.clear();
    app.session.last_output = None;
    app.session.attachments.clear();
    app.session.conversation = None;
    app.session.chat.set_metadata(SessionMetadata::default());
    app.view = ViewState::Chat;
    app.ui.scroll_to_bottom();

    if let Some(store) = app.full_history() {
        match store.create_conversation(&app.model()) {
            Ok(conversation) => {
                app.session.conversation = Some(ConversationRef {
                    id: conversation.id,
                    title: String::new(),
                });
            }
            Err(err) => warn!(error = %err, "Could not create conversation"),
        }
    }
    app.ui.set_notice("Started a new conversation");
}

/// Ask the store for a conversation; the log stays read-only until it arrives.
pub(super) fn load_conversation(
    app: &mut App,
    store: Arc<dyn FullHistoryStore>,
    id: String,
) -> Vec<AppCommand> {
    debug!(conversation_id = %id, "Loading conversation");
    app.session.pending_load = Some(id.clone());
    vec![AppCommand::LoadConversation { store, id }]
}

pub(super) fn handle_conversation_loaded(app: &mut App, result: Result<Conversation, ChatError>) {
    app.session.pending_load = None;
    match result {
        Ok(conversation) => open_conversation(app, conversation),
        Err(error) => app.ui.set_error(error),
    }
}

pub(super) fn handle_manager_closed(
    app: &mut App,
    result: Result<Option<String>, ChatError>,
) -> Vec<AppCommand> {
    match result {
        Ok(Some(id)) => match app.full_history() {
            Some(store) => load_conversation(app, store, id),
            None => Vec::new(),
        },
        Ok(None) => {
            app.ui.clear_banner();
            Vec::new()
        }
        Err(error) => {
            app.ui.set_error(error);
            Vec::new()
        }
    }
}

pub(super) fn handle_file_uploaded(app: &mut App, result: Result<UploadedFile, ChatError>) {
    match result {
        Ok(file) => {
            info!(file = %file.name, "Attachment uploaded");
            let name = file.name.clone();
            app.session.attachments.push(file);
            app.ui.set_notice(format!(
                "Attached {name} ({} file(s) pending)",
                app.session.attachments.len()
            ));
        }
        Err(error) => app.ui.set_error(error),
    }
}

pub(super) fn handle_export_result(app: &mut App, result: Result<ExportOutcome, ChatError>) {
    match result {
        Ok(outcome) => {
            let verb = if outcome.overwritten {
                "Overwrote"
            } else {
                "Exported to"
            };
            app.ui.set_notice(format!(
                "{verb} {} ({})",
                path_display(&outcome.path),
                outcome.format.label()
            ));
        }
        Err(error) => app.ui.set_error(error),
    }
}

pub(super) fn handle_download_result(app: &mut App, result: Result<DownloadOutcome, ChatError>) {
    match result {
        Ok(outcome) => app.ui.set_notice(format!(
            "Saved {} image(s) to {}",
            outcome.paths.len(),
            path_display(&outcome.directory)
        )),
        Err(error) => app.ui.set_error(error),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::core::app::actions::{apply_action, AppAction, TaskResult};
    use crate::core::error::ErrorKind;
    use crate::core::export::ExportFormat;
    use crate::core::history::{FullHistoryStore, HistoryStore};
    use crate::core::message::ChatEntry;
    use crate::utils::test_utils::{create_test_app, create_test_app_with_history, MemoryHistory};

    #[test]
    fn loaded_conversation_replaces_session() {
        let history = Arc::new(MemoryHistory::default());
        let conversation = history.create_conversation("gemini-pro").expect("create");
        history
            .add_message(&conversation.id, &ChatEntry::user("hello"))
            .expect("add");
        history
            .update_metadata(&conversation.id, &SessionMetadata::new("c", "r", "rc"))
            .expect("metadata");
        history.update_title(&conversation.id, "Greeting").expect("title");
        let stored = history.get_conversation(&conversation.id).expect("get");

        let mut app = create_test_app_with_history(history);
        app.session.attachments.push(UploadedFile {
            id: "x".into(),
            name: "x".into(),
        });
        apply_action(
            &mut app,
            AppAction::Task(TaskResult::ConversationLoaded(Ok(stored))),
        );

        assert_eq!(app.session.messages, vec![ChatEntry::user("hello")]);
        assert_eq!(app.session.title(), Some("Greeting"));
        assert_eq!(app.session.chat.metadata().cid, "c");
        assert_eq!(app.session.chat.model(), "gemini-pro");
        assert!(app.session.attachments.is_empty());
    }

    #[test]
    fn manager_selection_loads_conversation() {
        let history = Arc::new(MemoryHistory::default());
        let mut app = create_test_app_with_history(history);
        let commands = apply_action(
            &mut app,
            AppAction::Task(TaskResult::ManagerClosed(Ok(Some("abc".into())))),
        );
        assert!(matches!(
            commands.as_slice(),
            [AppCommand::LoadConversation { id, .. }] if id == "abc"
        ));
    }

    #[test]
    fn uploads_accumulate_attachments() {
        let mut app = create_test_app();
        for name in ["a.png", "b.pdf"] {
            apply_action(
                &mut app,
                AppAction::Task(TaskResult::FileUploaded(Ok(UploadedFile {
                    id: name.into(),
                    name: name.into(),
                }))),
            );
        }
        assert_eq!(app.session.attachments.len(), 2);
        assert_eq!(app.ui.notice(), Some("Attached b.pdf (2 file(s) pending)"));

        apply_action(
            &mut app,
            AppAction::Task(TaskResult::FileUploaded(Err(ChatError::new(
                ErrorKind::Upload,
                "too big",
            )))),
        );
        assert_eq!(app.session.attachments.len(), 2);
        assert_eq!(app.ui.error().map(|e| e.kind), Some(ErrorKind::Upload));
    }

    #[test]
    fn export_and_download_results_surface_notices() {
        let mut app = create_test_app();
        apply_action(
            &mut app,
            AppAction::Task(TaskResult::ExportResult(Ok(ExportOutcome {
                path: PathBuf::from("/tmp/chat.json"),
                format: ExportFormat::Json,
                overwritten: true,
            }))),
        );
        assert!(app.ui.notice().is_some_and(|n| n.starts_with("Overwrote")));

        apply_action(
            &mut app,
            AppAction::Task(TaskResult::DownloadResult(Ok(DownloadOutcome {
                paths: vec![PathBuf::from("/tmp/a.png"), PathBuf::from("/tmp/b.png")],
                directory: PathBuf::from("/tmp"),
            }))),
        );
        assert_eq!(app.ui.notice(), Some("Saved 2 image(s) to /tmp"));
    }
}
