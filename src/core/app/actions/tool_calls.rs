//! Tool round-trips: confirm, execute and report each call in order, then
//! send the batched results back as a follow-up prompt.

use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info};

use super::{chat, AppCommand, TaskResult};
use crate::core::app::view::ToolConfirmation;
use crate::core::app::{App, KeyBinding, KeyContext, ViewState};
use crate::tools::{format_tool_batch, format_tool_result, ToolResult};

/// Move the round-trip forward by one step.
pub(super) fn advance(app: &mut App) -> Vec<AppCommand> {
    let Some(round_trip) = app.session.round_trip.as_mut() else {
        return Vec::new();
    };
    if round_trip.active.is_some() {
        return Vec::new();
    }

    let Some(call) = round_trip.queue.pop_front() else {
        return finish(app);
    };
    round_trip.active = Some(call.clone());

    match app.tools.get(&call.name) {
        None => {
            debug!(tool = %call.name, "Unknown tool requested");
            vec![AppCommand::Deliver(TaskResult::ToolExecuted(
                ToolResult::unknown(call),
            ))]
        }
        Some(tool) if tool.requires_confirmation(&call.args) && !app.auto_approve => {
            info!(tool = %call.name, "Awaiting confirmation");
            app.view = ViewState::ConfirmTool(ToolConfirmation { call });
            Vec::new()
        }
        Some(_) => vec![AppCommand::RunTool(call)],
    }
}

fn finish(app: &mut App) -> Vec<AppCommand> {
    let Some(round_trip) = app.session.round_trip.take() else {
        return Vec::new();
    };
    if round_trip.results.is_empty() {
        app.ui.loading = false;
        return Vec::new();
    }
    app.session.tool_chain_depth += 1;
    let batch = format_tool_batch(&round_trip.results);
    chat::start_send(app, batch, Vec::new())
}

pub(super) fn handle_tool_executed(app: &mut App, result: ToolResult) -> Vec<AppCommand> {
    let Some(round_trip) = app.session.round_trip.as_mut() else {
        debug!(tool = %result.call.name, "Ignoring tool result after cancel");
        return Vec::new();
    };
    if round_trip.active.as_ref() != Some(&result.call) {
        debug!(tool = %result.call.name, "Ignoring stale tool result");
        return Vec::new();
    }
    round_trip.active = None;
    round_trip.results.push(format_tool_result(&result));

    let entry = round_trip.entry_for(result.summary());
    info!(tool = %result.call.name, ok = result.success(), "Tool finished");
    app.push_entry(entry);
    advance(app)
}

pub(super) fn handle_confirm_key(app: &mut App, key: &KeyEvent) -> Vec<AppCommand> {
    let ViewState::ConfirmTool(confirmation) = &app.view else {
        return Vec::new();
    };
    let call = confirmation.call.clone();

    match app.keymap.resolve(KeyContext::ConfirmTool, key) {
        Some(KeyBinding::Quit) => {
            app.request_exit();
            Vec::new()
        }
        Some(KeyBinding::Approve) => {
            info!(tool = %call.name, "Tool approved");
            app.view = ViewState::Chat;
            vec![AppCommand::RunTool(call)]
        }
        Some(KeyBinding::Deny) => {
            info!(tool = %call.name, "Tool denied");
            app.view = ViewState::Chat;
            vec![AppCommand::Deliver(TaskResult::ToolExecuted(
                ToolResult::denied(call),
            ))]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    use super::*;
    use crate::api::{ModelOutput, WebImage};
    use crate::core::app::actions::{apply_action, submit_text, AppAction};
    use crate::core::app::MAX_TOOL_CHAIN_DEPTH;
    use crate::core::error::ErrorKind;
    use crate::core::message::EntryRole;
    use crate::tools::{ToolCall, ToolRegistry};
    use crate::utils::test_utils::{
        create_test_app_with_tools, drive, EchoTool, FakeSession, GuardedTool,
    };

    fn tool_block(name: &str, x: &str) -> String {
        format!("```tool_call\n{{\"name\": \"{name}\", \"args\": {{\"x\": \"{x}\"}}, \"reason\": \"test\"}}\n```")
    }

    fn reply(text: impl Into<String>) -> ModelOutput {
        ModelOutput {
            text: text.into(),
            ..ModelOutput::default()
        }
    }

    fn press(app: &mut App, code: KeyCode) -> Vec<AppCommand> {
        apply_action(app, AppAction::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn roles(app: &App) -> Vec<EntryRole> {
        app.session.messages.iter().map(|e| e.role).collect()
    }

    fn registry_with(guarded: Option<GuardedTool>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        if let Some(tool) = guarded {
            registry.register(Arc::new(tool));
        }
        registry
    }

    #[tokio::test]
    async fn single_tool_call_round_trip() {
        let session = FakeSession::with_replies(vec![
            reply(tool_block("echo", "hi")),
            reply("All done"),
        ]);
        let mut app = create_test_app_with_tools(session.clone(), registry_with(None));

        let commands = submit_text(&mut app, "please echo");
        drive(&mut app, commands).await;

        assert_eq!(
            roles(&app),
            vec![EntryRole::User, EntryRole::Tool, EntryRole::Assistant]
        );
        assert!(app.session.messages[1].content.contains("**echo**"));
        assert_eq!(app.session.messages[2].content, "All done");
        assert!(!app.ui.loading);

        let prompts = session.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(
            prompts[1],
            "```tool_result\n{\"name\":\"echo\",\"success\":true,\"output\":\"hi\",\"truncated\":false}\n```"
        );
    }

    #[tokio::test]
    async fn reply_thoughts_and_images_survive_tool_calls() {
        let image = WebImage {
            url: "https://example.com/cat.png".into(),
            title: "cat".into(),
            alt: String::new(),
        };
        let first = ModelOutput {
            text: format!("Looking.\n\n{}", tool_block("echo", "hi")),
            thoughts: Some("need the file first".into()),
            images: vec![image.clone()],
        };
        let session = FakeSession::with_replies(vec![first, reply("done")]);
        let mut app = create_test_app_with_tools(session, registry_with(None));

        let commands = submit_text(&mut app, "go");
        drive(&mut app, commands).await;

        assert_eq!(
            roles(&app),
            vec![EntryRole::User, EntryRole::Tool, EntryRole::Assistant]
        );
        let tool_entry = &app.session.messages[1];
        assert!(tool_entry.content.starts_with("Looking."));
        assert_eq!(tool_entry.thoughts.as_deref(), Some("need the file first"));
        assert_eq!(tool_entry.images, vec![image]);
        assert!(app.session.messages[2].thoughts.is_none());
    }

    #[tokio::test]
    async fn tool_instructions_only_prefix_fresh_conversations() {
        let session = FakeSession::with_replies(vec![reply("hi"), reply("again")]);
        let mut app = create_test_app_with_tools(session.clone(), registry_with(None));

        let commands = submit_text(&mut app, "first");
        drive(&mut app, commands).await;
        let commands = submit_text(&mut app, "second");
        drive(&mut app, commands).await;

        let prompts = session.prompts();
        assert!(prompts[0].starts_with("[Tools]"));
        assert!(prompts[0].ends_with("first"));
        assert_eq!(prompts[1], "second");
    }

    #[tokio::test]
    async fn denied_tool_records_error_and_continues() {
        let guarded = GuardedTool::default();
        let runs = guarded.runs.clone();
        let text = format!("{}\n\n{}", tool_block("danger", "rm"), tool_block("echo", "after"));
        let session = FakeSession::with_replies(vec![reply(text), reply("Understood")]);
        let mut app = create_test_app_with_tools(session.clone(), registry_with(Some(guarded)));

        let commands = submit_text(&mut app, "go");
        drive(&mut app, commands).await;
        assert!(matches!(app.view, ViewState::ConfirmTool(_)));
        assert!(app.ui.loading);

        // Unrelated keys are ignored while confirming.
        assert!(press(&mut app, KeyCode::Char('x')).is_empty());
        assert!(matches!(app.view, ViewState::ConfirmTool(_)));

        let commands = press(&mut app, KeyCode::Char('n'));
        drive(&mut app, commands).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(
            roles(&app),
            vec![
                EntryRole::User,
                EntryRole::Tool,
                EntryRole::Tool,
                EntryRole::Assistant
            ]
        );
        assert!(app.session.messages[1].content.contains("Error: user denied"));
        assert!(app.session.messages[2].content.contains("after"));

        let prompts = session.prompts();
        let batch = &prompts[1];
        let denied = batch.find("\"danger\"").expect("denied block");
        let echoed = batch.find("\"echo\"").expect("echo block");
        assert!(denied < echoed);
        assert!(batch.contains("\"error\":\"user denied\""));
    }

    #[tokio::test]
    async fn approved_tool_runs() {
        let guarded = GuardedTool::default();
        let runs = guarded.runs.clone();
        let session = FakeSession::with_replies(vec![
            reply(tool_block("danger", "ok")),
            reply("Finished"),
        ]);
        let mut app = create_test_app_with_tools(session, registry_with(Some(guarded)));

        let commands = submit_text(&mut app, "go");
        drive(&mut app, commands).await;
        let commands = press(&mut app, KeyCode::Char('y'));
        drive(&mut app, commands).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(app.view.is_chat());
        assert_eq!(
            app.session.messages.last().map(|e| e.content.as_str()),
            Some("Finished")
        );
    }

    #[tokio::test]
    async fn auto_approve_skips_confirmation() {
        let guarded = GuardedTool::default();
        let runs = guarded.runs.clone();
        let session = FakeSession::with_replies(vec![reply(tool_block("danger", "ok")), reply("ok")]);
        let mut app = create_test_app_with_tools(session, registry_with(Some(guarded)));
        app.auto_approve = true;

        let commands = submit_text(&mut app, "go");
        drive(&mut app, commands).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tools_produce_error_entries() {
        let session = FakeSession::with_replies(vec![
            reply(format!("Let me try.\n\n{}", tool_block("nope", "1"))),
            reply("Sorry"),
        ]);
        let mut app = create_test_app_with_tools(session, registry_with(None));

        let commands = submit_text(&mut app, "go");
        drive(&mut app, commands).await;

        let tool_entry = &app.session.messages[1];
        assert!(tool_entry.content.starts_with("Let me try."));
        assert!(tool_entry.content.contains("Error: unknown tool: nope"));
    }

    #[tokio::test]
    async fn chained_tool_use_is_capped() {
        let replies = (0..MAX_TOOL_CHAIN_DEPTH + 2)
            .map(|i| reply(format!("step {i}\n\n{}", tool_block("echo", "again"))))
            .collect();
        let session = FakeSession::with_replies(replies);
        let mut app = create_test_app_with_tools(session.clone(), registry_with(None));

        let commands = submit_text(&mut app, "loop");
        drive(&mut app, commands).await;

        assert_eq!(app.ui.error().map(|e| e.kind), Some(ErrorKind::ToolExecution));
        let tools = roles(&app)
            .iter()
            .filter(|role| **role == EntryRole::Tool)
            .count();
        assert_eq!(tools, MAX_TOOL_CHAIN_DEPTH);
        assert_eq!(roles(&app).last(), Some(&EntryRole::Assistant));
        assert_eq!(session.prompts().len(), MAX_TOOL_CHAIN_DEPTH + 1);
        assert!(!app.ui.loading);
    }

    #[test]
    fn results_after_cancel_are_ignored() {
        let mut app = create_test_app_with_tools(FakeSession::new(), registry_with(None));
        let commands = submit_text(&mut app, "go");
        let request_id = app.session.pending_request.expect("pending");
        drop(commands);

        let commands = apply_action(
            &mut app,
            AppAction::Task(TaskResult::Response {
                request_id,
                output: reply(tool_block("echo", "late")),
            }),
        );
        let call = commands
            .iter()
            .find_map(|c| match c {
                AppCommand::RunTool(call) => Some(call.clone()),
                _ => None,
            })
            .expect("tool dispatched");

        press(&mut app, KeyCode::Esc);
        assert!(!app.ui.loading);
        assert!(app.session.round_trip.is_none());

        let before = app.session.messages.len();
        let mut result = ToolResult::failure(call, "unused");
        result.error = None;
        result.output = "late".into();
        let commands = apply_action(&mut app, AppAction::Task(TaskResult::ToolExecuted(result)));
        assert!(commands.is_empty());
        assert_eq!(app.session.messages.len(), before);
    }

    #[test]
    fn stale_results_for_other_calls_are_ignored() {
        let mut app = create_test_app_with_tools(FakeSession::new(), registry_with(None));
        let commands = submit_text(&mut app, "go");
        let request_id = app.session.pending_request.expect("pending");
        drop(commands);
        apply_action(
            &mut app,
            AppAction::Task(TaskResult::Response {
                request_id,
                output: reply(tool_block("echo", "a")),
            }),
        );

        let stranger = ToolCall {
            name: "echo".into(),
            args: Default::default(),
            reason: String::new(),
        };
        let commands = apply_action(
            &mut app,
            AppAction::Task(TaskResult::ToolExecuted(ToolResult::denied(stranger))),
        );
        assert!(commands.is_empty());
        assert!(app.session.round_trip.is_some());
    }
}
