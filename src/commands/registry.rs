use super::{handlers, CommandResult};
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    /// Name as typed, lower-cased; may be an alias.
    pub name: &'a str,
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.split_whitespace().nth(index)
    }

    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands().iter().find(|command| {
        command.name.eq_ignore_ascii_case(name)
            || command
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

const COMMANDS: &[Command] = &[
    Command {
        name: "exit",
        aliases: &["quit"],
        usage: "/exit",
        help: "Leave the chat.",
        handler: handlers::core::handle_exit,
    },
    Command {
        name: "help",
        aliases: &[],
        usage: "/help",
        help: "Show this command list.",
        handler: handlers::core::handle_help,
    },
    Command {
        name: "gems",
        aliases: &["gem"],
        usage: "/gems",
        help: "Pick a gem for the session (Ctrl-G).",
        handler: handlers::conversation::handle_gems,
    },
    Command {
        name: "history",
        aliases: &["hist"],
        usage: "/history",
        help: "Switch to a saved conversation or start a new one.",
        handler: handlers::conversation::handle_history,
    },
    Command {
        name: "manage",
        aliases: &[],
        usage: "/manage",
        help: "Open the history manager.",
        handler: handlers::conversation::handle_manage,
    },
    Command {
        name: "favorite",
        aliases: &["fav"],
        usage: "/favorite",
        help: "Toggle favorite on the current conversation.",
        handler: handlers::conversation::handle_favorite,
    },
    Command {
        name: "file",
        aliases: &["image"],
        usage: "/file <path>",
        help: "Upload a file and attach it to the next message.",
        handler: handlers::io::handle_file,
    },
    Command {
        name: "clear",
        aliases: &[],
        usage: "/clear",
        help: "Drop pending attachments and clear the input.",
        handler: handlers::core::handle_clear,
    },
    Command {
        name: "export",
        aliases: &[],
        usage: "/export [path] [-f json|md]",
        help: "Export the conversation (Ctrl-E).",
        handler: handlers::io::handle_export,
    },
    Command {
        name: "save",
        aliases: &["download"],
        usage: "/save [dir]",
        help: "Download images from the last response.",
        handler: handlers::io::handle_save,
    },
    Command {
        name: "model",
        aliases: &[],
        usage: "/model [name]",
        help: "Show or switch the model.",
        handler: handlers::core::handle_model,
    },
    Command {
        name: "persona",
        aliases: &[],
        usage: "/persona [name|off|export]",
        help: "List, activate, clear or export personas.",
        handler: handlers::core::handle_persona,
    },
];
