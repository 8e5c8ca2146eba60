use tracing::info;

use super::fail;
use crate::commands::registry::CommandInvocation;
use crate::commands::{all_commands, CommandResult};
use crate::core::app::App;
use crate::utils::path::path_display;

pub(crate) fn handle_exit(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.request_exit();
    CommandResult::Continue
}

pub(crate) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or_default();
    let lines: Vec<String> = all_commands()
        .iter()
        .map(|command| format!("{:width$}  {}", command.usage, command.help))
        .collect();
    app.ui.set_notice(lines.join("\n"));
    CommandResult::Continue
}

pub(crate) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let dropped = app.session.attachments.len();
    app.session.attachments.clear();
    app.ui.clear_input();
    if dropped > 0 {
        app.ui.set_notice(format!("Cleared {dropped} attachment(s)"));
    }
    CommandResult::Continue
}

pub(crate) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg(0) {
        None => {
            let model = app.model();
            app.ui.set_notice(format!("Model: {model}"));
        }
        Some(model) => {
            info!(model, "Switching model");
            app.session.chat.set_model(model);
            app.ui.set_notice(format!("Switched model to {model}"));
        }
    }
    CommandResult::Continue
}

pub(crate) fn handle_persona(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.args {
        "" => {
            let names: Vec<&str> = app.personas.list().iter().map(|p| p.name.as_str()).collect();
            let listing = if names.is_empty() {
                "No personas configured".to_string()
            } else {
                format!("Personas: {}", names.join(", "))
            };
            let active = app
                .personas
                .active()
                .map(|p| format!(" (active: {})", p.name))
                .unwrap_or_default();
            app.ui.set_notice(format!("{listing}{active}"));
        }
        "off" | "none" => {
            app.personas.clear();
            app.ui.set_notice("Persona cleared");
        }
        "export" => match app.personas.export_active() {
            Ok(path) => app
                .ui
                .set_notice(format!("Persona saved to {}", path_display(&path))),
            Err(err) => return fail(app, err),
        },
        name => match app.personas.activate(name) {
            Ok(persona) => {
                let notice = format!("Persona: {}", persona.name);
                app.ui.set_notice(notice);
            }
            Err(err) => return fail(app, err),
        },
    }
    CommandResult::Continue
}
