mod handlers;
mod registry;

pub use registry::{all_commands, find_command, Command, CommandInvocation};

use crate::core::app::{App, AppCommand};
use crate::core::error::ChatError;

pub enum CommandResult {
    Continue,
    /// Deferred work for the loop driver.
    Run(Vec<AppCommand>),
    ProcessAsMessage(String),
}

impl CommandResult {
    pub fn run(command: AppCommand) -> Self {
        CommandResult::Run(vec![command])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub is_command: bool,
    /// Lower-cased command name without the leading `/`.
    pub name: String,
    pub args: String,
}

pub fn parse_command(input: &str) -> ParsedCommand {
    let Some(rest) = input.strip_prefix('/') else {
        return ParsedCommand {
            is_command: false,
            name: String::new(),
            args: String::new(),
        };
    };
    let (name, args) = match rest.find(char::is_whitespace) {
        Some(split) => (&rest[..split], &rest[split..]),
        None => (rest, ""),
    };
    ParsedCommand {
        is_command: true,
        name: name.to_lowercase(),
        args: args.trim().to_string(),
    }
}

/// `exit` and `quit` typed without a slash.
pub fn is_bare_exit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();
    if is_bare_exit(trimmed) {
        app.request_exit();
        return CommandResult::Continue;
    }

    let parsed = parse_command(trimmed);
    if !parsed.is_command {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    match registry::find_command(&parsed.name) {
        Some(command) => {
            let invocation = CommandInvocation {
                input: trimmed,
                name: &parsed.name,
                args: &parsed.args,
            };
            (command.handler)(app, invocation)
        }
        None => {
            app.ui
                .set_error(ChatError::validation(format!("unknown command: /{}", parsed.name)));
            CommandResult::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::create_test_app;

    #[test]
    fn parses_name_and_trimmed_args() {
        let parsed = parse_command("/Export   notes.md  -f md ");
        assert!(parsed.is_command);
        assert_eq!(parsed.name, "export");
        assert_eq!(parsed.args, "notes.md  -f md");

        let parsed = parse_command("/gems");
        assert_eq!(parsed.name, "gems");
        assert_eq!(parsed.args, "");

        let parsed = parse_command("/file\tphoto.png");
        assert_eq!(parsed.name, "file");
        assert_eq!(parsed.args, "photo.png");
    }

    #[test]
    fn parse_matches_concatenated_form() {
        for (name, args) in [("Gem", " coder "), ("HISTORY", ""), ("x", "a b c")] {
            let parsed = parse_command(&format!("/{name} {args}"));
            assert_eq!(
                (parsed.is_command, parsed.name.as_str(), parsed.args.as_str()),
                (true, name.to_lowercase().as_str(), args.trim())
            );
        }
    }

    #[test]
    fn non_slash_input_is_not_a_command() {
        for input in ["hello", " /leading-space", "", "exit"] {
            assert!(!parse_command(input).is_command);
        }
    }

    #[test]
    fn bare_exit_words() {
        assert!(is_bare_exit("exit"));
        assert!(is_bare_exit(" QUIT "));
        assert!(!is_bare_exit("exit now"));
    }

    #[test]
    fn unknown_commands_are_not_sent() {
        let mut app = create_test_app();
        let result = process_input(&mut app, "/foo bar");
        assert!(matches!(result, CommandResult::Continue));
        assert_eq!(
            app.ui.error().map(|e| e.message.as_str()),
            Some("unknown command: /foo")
        );
        assert!(app.session.messages.is_empty());
    }

    #[test]
    fn aliases_resolve_to_the_same_handler() {
        for (alias, canonical) in [
            ("quit", "exit"),
            ("gem", "gems"),
            ("hist", "history"),
            ("fav", "favorite"),
            ("image", "file"),
            ("download", "save"),
        ] {
            let a = find_command(alias).expect(alias);
            let b = find_command(canonical).expect(canonical);
            assert_eq!(a.name, b.name);
        }
    }
}
