use chrono::Local;
use tracing::debug;

use super::{fail, usage_error};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::view::ImagePickerState;
use crate::core::app::{App, AppCommand, ExportRequest, ExportSource, ViewState};
use crate::core::error::ChatError;
use crate::core::export::{parse_export_args, resolve_export_target};
use crate::core::history::StoredMessage;
use crate::utils::path::{expand_tilde, path_display};

const USAGE_FILE: &str = "/file <path>";
const DEFAULT_EXPORT_TITLE: &str = "Conversation";

pub(crate) fn handle_file(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if !invocation.has_args() {
        return usage_error(app, USAGE_FILE);
    }
    let path = expand_tilde(invocation.args);
    if !path.exists() {
        return fail(
            app,
            ChatError::not_found(format!("file not found: {}", path_display(&path))),
        );
    }
    if path.is_dir() {
        return fail(
            app,
            ChatError::validation(format!("{} is a directory", path_display(&path))),
        );
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_display(&path));
    app.ui.set_notice(format!("Uploading {name}..."));
    CommandResult::run(AppCommand::UploadFile { path })
}

pub(crate) fn handle_export(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let args = match parse_export_args(invocation.args) {
        Ok(args) => args,
        Err(err) => return fail(app, err),
    };
    let title = app.session.title().map(str::to_string);
    let target = match resolve_export_target(&args, title.as_deref(), Local::now()) {
        Ok(target) => target,
        Err(err) => return fail(app, err),
    };

    let stored = app
        .full_history()
        .zip(app.session.conversation_id().map(str::to_string));
    let source = match stored {
        Some((store, id)) => ExportSource::Stored { store, id },
        None if app.session.messages.is_empty() => {
            return fail(app, ChatError::validation("nothing to export yet"));
        }
        None => ExportSource::Log {
            title: title.unwrap_or_else(|| DEFAULT_EXPORT_TITLE.to_string()),
            messages: app
                .session
                .messages
                .iter()
                .map(|entry| StoredMessage::from_entry(entry, None))
                .collect(),
        },
    };

    debug!(path = %target.path.display(), format = target.format.label(), "Export requested");
    CommandResult::run(AppCommand::Export(ExportRequest { target, source }))
}

pub(crate) fn handle_save(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(output) = app
        .session
        .last_output
        .as_ref()
        .filter(|output| !output.images.is_empty())
        .cloned()
    else {
        return fail(
            app,
            ChatError::validation("the last response has no images to save"),
        );
    };

    let directory = if invocation.has_args() {
        expand_tilde(invocation.args)
    } else {
        app.session.download_dir.clone()
    };
    app.view = ViewState::PickImage(ImagePickerState::new(output, directory));
    CommandResult::Continue
}
