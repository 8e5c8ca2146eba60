use tracing::{debug, info, warn};

use super::{schedule_tick, tool_calls, AppCommand};
use crate::api::{ModelOutput, UploadedFile};
use crate::core::app::{App, ToolRoundTrip, MAX_TOOL_CHAIN_DEPTH};
use crate::core::error::ChatError;
use crate::core::extensions::detect_extension;
use crate::core::message::ChatEntry;
use crate::tools::extract_tool_calls;

/// Start a user turn: log the entry, then send the wire prompt.
pub(super) fn begin_turn(app: &mut App, text: &str) -> Vec<AppCommand> {
    app.ui.clear_banner();
    app.ensure_conversation(text);
    app.push_entry(ChatEntry::user(text));
    app.ui.extension_hint = detect_extension(text);

    let wire_prompt = app.personas.wire_prompt(text);
    app.ui.clear_input();
    app.session.tool_chain_depth = 0;
    let attachments = std::mem::take(&mut app.session.attachments);
    start_send(app, wire_prompt, attachments)
}

/// Dispatch a remote send and mark the loop busy.
pub(super) fn start_send(
    app: &mut App,
    prompt: String,
    attachments: Vec<UploadedFile>,
) -> Vec<AppCommand> {
    let prompt = with_tool_instructions(app, prompt);
    let request_id = app.session.begin_request();
    app.ui.loading = true;
    info!(
        request_id,
        attachments = attachments.len(),
        depth = app.session.tool_chain_depth,
        "Sending message"
    );

    let mut commands = vec![AppCommand::SendMessage {
        request_id,
        prompt,
        attachments,
    }];
    commands.extend(schedule_tick(app));
    commands
}

/// Tool instructions go in front of the first prompt of a fresh remote conversation.
fn with_tool_instructions(app: &App, prompt: String) -> String {
    if app.tools.is_empty() || !app.session.chat.metadata().cid.is_empty() {
        return prompt;
    }
    format!("{}\n{prompt}", app.tools.instructions())
}

pub(super) fn handle_response(
    app: &mut App,
    request_id: u64,
    output: ModelOutput,
) -> Vec<AppCommand> {
    let current = app.session.is_pending(request_id);
    if current {
        app.ui.loading = false;
        app.session.pending_request = None;
    } else {
        debug!(request_id, "Applying late response");
    }
    app.session.last_output = Some(output.clone());

    let (calls, clean_text) = extract_tool_calls(&output.text);
    let display_text = if calls.is_empty() {
        output.text.clone()
    } else {
        clean_text
    };

    if !calls.is_empty() {
        if !current {
            debug!(request_id, calls = calls.len(), "Dropping tool calls from late response");
        } else if app.session.tool_chain_depth >= MAX_TOOL_CHAIN_DEPTH {
            warn!(depth = app.session.tool_chain_depth, "Tool chain limit reached");
            app.ui.set_error(ChatError::tool(format!(
                "tool chain stopped after {MAX_TOOL_CHAIN_DEPTH} follow-up requests"
            )));
        } else {
            persist_metadata(app);
            let preamble = Some(display_text.trim())
                .filter(|text| !text.is_empty())
                .map(str::to_string);
            let thoughts = output.thoughts().map(str::to_string);
            info!(calls = calls.len(), "Starting tool round-trip");
            app.session.round_trip = Some(
                ToolRoundTrip::new(calls, preamble).with_reply_extras(thoughts, output.images),
            );
            app.ui.loading = true;

            let mut commands = tool_calls::advance(app);
            commands.extend(schedule_tick(app));
            return commands;
        }
    }

    let thoughts = output.thoughts().map(str::to_string);
    if !display_text.trim().is_empty() || thoughts.is_some() || !output.images.is_empty() {
        app.push_entry(ChatEntry::assistant(display_text, thoughts, output.images));
    }
    persist_metadata(app);
    Vec::new()
}

pub(super) fn handle_send_error(app: &mut App, request_id: u64, error: ChatError) {
    if app.session.is_pending(request_id) {
        app.ui.loading = false;
        app.session.pending_request = None;
        app.session.round_trip = None;
    }
    warn!(request_id, kind = error.kind.label(), error = %error, "Send failed");
    app.ui.set_error(error);
}

fn persist_metadata(app: &App) {
    let metadata = app.session.chat.metadata();
    if metadata.is_empty() {
        return;
    }
    app.persist("metadata", |history, id| {
        history.update_metadata(id, &metadata)
    });
}
