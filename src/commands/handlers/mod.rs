pub(super) mod conversation;
pub(super) mod core;
pub(super) mod io;

use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::error::ChatError;

pub(super) fn usage_error(app: &mut App, usage: &'static str) -> CommandResult {
    app.ui
        .set_error(ChatError::validation(format!("usage: {usage}")));
    CommandResult::Continue
}

pub(super) fn fail(app: &mut App, error: impl Into<ChatError>) -> CommandResult {
    app.ui.set_error(error.into());
    CommandResult::Continue
}
