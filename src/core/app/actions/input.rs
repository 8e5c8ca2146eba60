use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info};

use super::{chat, picker, tool_calls, AppCommand};
use crate::commands::{self, CommandResult};
use crate::core::app::{App, KeyBinding, KeyContext, ViewState};
use crate::ui::renderer;

pub(super) fn handle_key(app: &mut App, key: KeyEvent) -> Vec<AppCommand> {
    if matches!(app.view, ViewState::ConfirmTool(_)) {
        return tool_calls::handle_confirm_key(app, &key);
    }

    if app.ui.loading {
        return match app.keymap.resolve(KeyContext::Chat, &key) {
            Some(KeyBinding::Quit) => {
                app.request_exit();
                Vec::new()
            }
            Some(KeyBinding::Cancel) => {
                cancel_loading(app);
                Vec::new()
            }
            _ => Vec::new(),
        };
    }

    match app.view {
        ViewState::Chat => handle_chat_key(app, key),
        ViewState::PickGem(_) | ViewState::PickHistory(_) => picker::handle_list_key(app, &key),
        ViewState::PickImage(_) => picker::handle_image_key(app, &key),
        ViewState::ConfirmTool(_) => Vec::new(),
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) -> Vec<AppCommand> {
    match app.keymap.resolve(KeyContext::Chat, &key) {
        Some(KeyBinding::Quit) | Some(KeyBinding::Cancel) => {
            app.request_exit();
            Vec::new()
        }
        Some(KeyBinding::Submit) => {
            let text = app.ui.input_text();
            submit_input(app, &text)
        }
        Some(KeyBinding::OpenGems) => run_command(app, "/gems"),
        Some(KeyBinding::OpenExport) => run_command(app, "/export"),
        Some(KeyBinding::ScrollUp) => {
            let max = renderer::max_scroll_offset(app);
            app.ui.scroll_up(1, max);
            Vec::new()
        }
        Some(KeyBinding::ScrollDown) => {
            app.ui.scroll_down(1);
            Vec::new()
        }
        Some(KeyBinding::PageUp) => {
            let max = renderer::max_scroll_offset(app);
            app.ui.scroll_up(page_lines(app), max);
            Vec::new()
        }
        Some(KeyBinding::PageDown) => {
            let lines = page_lines(app);
            app.ui.scroll_down(lines);
            Vec::new()
        }
        _ => {
            app.ui.apply_textarea_edit(|textarea| {
                textarea.input(tui_textarea::Input::from(key));
            });
            Vec::new()
        }
    }
}

fn page_lines(app: &App) -> usize {
    usize::from(app.ui.viewport_height()).saturating_sub(1).max(1)
}

/// Enter in the chat view.
pub(super) fn submit_input(app: &mut App, raw: &str) -> Vec<AppCommand> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(continued) = raw.trim_end().strip_suffix('\\') {
        app.ui.set_input_text(&format!("{continued}\n"));
        return Vec::new();
    }

    if trimmed.starts_with('/') || commands::is_bare_exit(trimmed) {
        return run_command(app, trimmed);
    }
    submit_text(app, raw)
}

fn run_command(app: &mut App, input: &str) -> Vec<AppCommand> {
    app.ui.clear_banner();
    let result = commands::process_input(app, input);
    if app.ui.error().is_none() {
        app.ui.clear_input();
    }
    match result {
        CommandResult::Continue => Vec::new(),
        CommandResult::Run(commands) => commands,
        CommandResult::ProcessAsMessage(text) => submit_text(app, &text),
    }
}

/// Send `text` as a user turn unless a request is already in flight.
pub(crate) fn submit_text(app: &mut App, text: &str) -> Vec<AppCommand> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if app.ui.loading {
        debug!("Refusing to send while a request is in flight");
        return Vec::new();
    }
    if app.session.pending_load.is_some() {
        debug!("Refusing to send while a conversation is loading");
        app.ui.set_notice("Still loading the conversation...");
        return Vec::new();
    }
    chat::begin_turn(app, text)
}

pub(super) fn handle_paste(app: &mut App, text: &str) {
    if app.ui.loading {
        return;
    }
    let text = sanitize_pasted_text(text);
    if text.is_empty() {
        return;
    }
    match &mut app.view {
        ViewState::Chat => app.ui.apply_textarea_edit(|textarea| {
            textarea.insert_str(&text);
        }),
        ViewState::PickGem(picker) => text
            .chars()
            .filter(|c| *c != '\n')
            .for_each(|c| picker.push_filter(c)),
        ViewState::PickHistory(picker) => text
            .chars()
            .filter(|c| *c != '\n')
            .for_each(|c| picker.push_filter(c)),
        ViewState::PickImage(_) | ViewState::ConfirmTool(_) => {}
    }
}

/// CRLF to LF, tabs to spaces, other control characters dropped.
pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

/// Esc while loading: free the UI and abandon any round-trip.
pub(crate) fn cancel_loading(app: &mut App) {
    app.ui.loading = false;
    app.session.pending_request = None;
    if let Some(round_trip) = app.session.round_trip.take() {
        info!(dropped = round_trip.queue.len(), "Abandoned tool round-trip");
    }
    app.view = ViewState::Chat;
    app.ui.set_notice("Request cancelled");
}

#[cfg(test)]
mod tests {
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    use super::*;
    use crate::api::UploadedFile;
    use crate::core::app::actions::{apply_action, AppAction};
    use crate::core::message::ChatEntry;
    use crate::utils::test_utils::create_test_app;

    fn key(code: KeyCode) -> AppAction {
        AppAction::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppAction {
        AppAction::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn trailing_backslash_continues_the_line() {
        let mut app = create_test_app();
        app.ui.set_input_text("hello\\");
        let commands = apply_action(&mut app, key(KeyCode::Enter));

        assert!(commands.is_empty());
        assert_eq!(app.ui.input_text(), "hello\n");
        assert_eq!(app.ui.cursor(), (1, 0));
        assert!(app.session.messages.is_empty());
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut app = create_test_app();
        app.ui.set_input_text("   \n  ");
        assert!(apply_action(&mut app, key(KeyCode::Enter)).is_empty());
        assert!(app.session.messages.is_empty());
    }

    #[test]
    fn unknown_command_sets_error_without_sending() {
        let mut app = create_test_app();
        app.ui.set_input_text("/foo bar");
        let commands = apply_action(&mut app, key(KeyCode::Enter));

        assert!(commands.is_empty());
        assert!(app.session.messages.is_empty());
        assert_eq!(
            app.ui.error().map(|e| e.message.as_str()),
            Some("unknown command: /foo")
        );
        assert_eq!(app.ui.input_text(), "/foo bar");
    }

    #[test]
    fn typing_goes_to_the_textarea() {
        let mut app = create_test_app();
        for c in "hi".chars() {
            apply_action(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.ui.input_text(), "hi");
    }

    #[test]
    fn loading_ignores_everything_but_cancel_and_quit() {
        let mut app = create_test_app();
        app.ui.set_input_text("hello");
        let commands = apply_action(&mut app, key(KeyCode::Enter));
        assert!(!commands.is_empty());
        assert!(app.ui.loading);

        app.session.attachments.push(UploadedFile {
            id: "f".into(),
            name: "f".into(),
        });
        let messages = app.session.messages.clone();
        let conversation = app.session.conversation.clone();
        let attachments = app.session.attachments.clone();

        for action in [
            key(KeyCode::Char('x')),
            key(KeyCode::Enter),
            ctrl('g'),
            ctrl('e'),
            AppAction::Paste("pasted".into()),
        ] {
            assert!(apply_action(&mut app, action).is_empty());
        }
        assert_eq!(app.session.messages, messages);
        assert_eq!(app.session.conversation, conversation);
        assert_eq!(app.session.attachments, attachments);
        assert_eq!(app.ui.input_text(), "");
        assert!(app.view.is_chat());

        apply_action(&mut app, key(KeyCode::Esc));
        assert!(!app.ui.loading);
        assert!(!app.ui.exit_requested);
        assert_eq!(app.ui.notice(), Some("Request cancelled"));
    }

    #[test]
    fn escape_quits_when_idle() {
        let mut app = create_test_app();
        apply_action(&mut app, key(KeyCode::Esc));
        assert!(app.ui.exit_requested);

        let mut app = create_test_app();
        apply_action(&mut app, ctrl('c'));
        assert!(app.ui.exit_requested);
    }

    #[test]
    fn bare_exit_terminates() {
        let mut app = create_test_app();
        app.ui.set_input_text("quit");
        apply_action(&mut app, key(KeyCode::Enter));
        assert!(app.ui.exit_requested);
        assert!(app.session.messages.is_empty());
    }

    #[test]
    fn paste_is_sanitised_into_input() {
        assert_eq!(sanitize_pasted_text("a\r\nb\tc\u{7}"), "a\nb    c");

        let mut app = create_test_app();
        apply_action(&mut app, AppAction::Paste("one\r\ntwo".into()));
        assert_eq!(app.ui.input_text(), "one\ntwo");
    }

    #[test]
    fn plain_text_becomes_user_turn() {
        let mut app = create_test_app();
        app.ui.set_input_text("  what is rust?  ");
        apply_action(&mut app, key(KeyCode::Enter));
        assert_eq!(
            app.session.messages,
            vec![ChatEntry::user("what is rust?")]
        );
    }
}
