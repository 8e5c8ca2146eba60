use tracing::{info, warn};

use super::fail;
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::view::{HistoryChoice, PickerState};
use crate::core::app::{App, AppCommand, ViewState};
use crate::core::error::ChatError;

pub(crate) fn handle_gems(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.view = ViewState::PickGem(PickerState::loading("Gems", Vec::new()));
    CommandResult::run(AppCommand::LoadGems)
}

pub(crate) fn handle_history(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let store = match app.require_full_history(invocation.name) {
        Ok(store) => store,
        Err(err) => return fail(app, err),
    };
    app.view = ViewState::PickHistory(PickerState::loading("History", vec![HistoryChoice::New]));
    CommandResult::run(AppCommand::LoadHistory { store })
}

pub(crate) fn handle_manage(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match app.require_full_history(invocation.name) {
        Ok(store) => CommandResult::run(AppCommand::RunHistoryManager { store }),
        Err(err) => fail(app, err),
    }
}

pub(crate) fn handle_favorite(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let store = match app.require_full_history(invocation.name) {
        Ok(store) => store,
        Err(err) => return fail(app, err),
    };
    let Some(id) = app.session.conversation_id().map(str::to_string) else {
        return fail(app, ChatError::validation("no active conversation to favorite"));
    };

    match store.toggle_favorite(&id) {
        Ok(favorite) => {
            info!(conversation_id = %id, favorite, "Toggled favorite");
            app.ui.set_notice(if favorite {
                "Added to favorites"
            } else {
                "Removed from favorites"
            });
            CommandResult::Continue
        }
        Err(err) => {
            warn!(conversation_id = %id, error = %err, "Could not toggle favorite");
            fail(app, err)
        }
    }
}
