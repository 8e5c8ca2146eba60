//! Loop driver for interactive chat sessions.
//!
//! The driver owns [`App`] and the terminal. Each iteration draws a frame,
//! waits for the next [`AppAction`], runs Update over everything queued, and
//! hands the resulting commands to the executors.

mod event_loop;
pub mod executors;
mod lifecycle;

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::event_loop::spawn_event_reader;
use self::executors::{resolve, ExecutorContext};
use self::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use crate::api::RemoteClient;
use crate::core::app::{
    apply_action, apply_actions, App, AppAction, AppActionDispatcher, AppCommand, TaskResult,
};
use crate::core::error::ChatError;
use crate::tools::ToolExecutor;
use crate::ui::manager::run_history_manager;
use crate::ui::renderer::ui;

/// What to do once the loop is up.
#[derive(Debug, Default, Clone)]
pub struct Startup {
    /// Submitted as if typed, after the first frame.
    pub initial_prompt: Option<String>,
    /// Conversation to open before the first frame.
    pub resume: Option<String>,
}

struct EventReader {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventReader {
    fn start(dispatcher: &AppActionDispatcher) -> Self {
        let stop = CancellationToken::new();
        let handle = spawn_event_reader(dispatcher.clone(), stop.clone());
        Self { stop, handle }
    }

    async fn stop(self) {
        self.stop.cancel();
        if let Err(err) = self.handle.await {
            debug!(error = %err, "Event reader ended abnormally");
        }
    }
}

pub async fn run_chat(
    mut app: App,
    remote: Arc<dyn RemoteClient>,
    tools: ToolExecutor,
    startup: Startup,
) -> Result<(), Box<dyn Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = AppActionDispatcher::new(tx);
    let mut ctx = ExecutorContext {
        remote,
        chat: app.session.chat.clone(),
        tools,
        cancel: CancellationToken::new(),
        dispatcher: dispatcher.clone(),
    };

    if let Some(id) = startup.resume {
        resume_conversation(&mut app, &ctx, id).await;
    }

    let mut terminal = setup_terminal()?;
    let result = drive(&mut app, &mut terminal, &mut ctx, &mut rx, startup.initial_prompt).await;

    ctx.cancel.cancel();
    restore_terminal(&mut terminal)?;
    info!("Chat session ended");
    result
}

async fn resume_conversation(app: &mut App, ctx: &ExecutorContext, id: String) {
    let Some(store) = app.full_history() else {
        app.ui.set_error(ChatError::validation(
            "--resume requires a persistent history store",
        ));
        return;
    };
    info!(conversation_id = %id, "Resuming conversation");
    if let Some(action) = resolve(ctx, AppCommand::LoadConversation { store, id }).await {
        for command in apply_action(app, action) {
            ctx.spawn(command);
        }
    }
}

async fn drive(
    app: &mut App,
    terminal: &mut ChatTerminal,
    ctx: &mut ExecutorContext,
    rx: &mut mpsc::UnboundedReceiver<AppAction>,
    initial_prompt: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let size = terminal.size()?;
    ctx.dispatcher.dispatch(AppAction::Resize {
        width: size.width,
        height: size.height,
    });
    if let Some(prompt) = initial_prompt {
        ctx.dispatcher.task(TaskResult::InitialPrompt(prompt));
    }

    let mut reader = EventReader::start(&ctx.dispatcher);

    while !app.ui.exit_requested {
        terminal.draw(|f| ui(f, app))?;

        let Some(first) = rx.recv().await else {
            break;
        };
        let mut actions = vec![first];
        while let Ok(action) = rx.try_recv() {
            actions.push(action);
        }
        let was_loading = app.ui.loading;
        let commands = apply_actions(app, actions);

        // Anything still running for an abandoned or finished round-trip stops here.
        if was_loading && !app.ui.loading {
            ctx.cancel.cancel();
            ctx.cancel = CancellationToken::new();
        }

        for command in commands {
            match command {
                AppCommand::RunHistoryManager { store } => {
                    reader.stop().await;
                    let theme = app.ui.theme.clone();
                    let outcome = tokio::task::block_in_place(|| {
                        run_history_manager(terminal, store, &theme)
                    });
                    if let Err(err) = &outcome {
                        warn!(error = %err, "History manager failed");
                    }
                    terminal.clear()?;
                    ctx.dispatcher.task(TaskResult::ManagerClosed(outcome));
                    reader = EventReader::start(&ctx.dispatcher);
                }
                command => {
                    debug!(command = command.name(), "Spawning command");
                    ctx.spawn(command);
                }
            }
        }
    }

    reader.stop().await;
    Ok(())
}
