//! Command-line parsing and startup wiring.
//!
//! Startup order: config, tracing, remote client, chat session, history
//! store, App, then the loop driver.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::api::http::{RemoteSettings, WebClient};
use crate::api::RemoteClient;
use crate::core::app::{App, AppInit};
use crate::core::config::Config;
use crate::core::history::{FileHistoryStore, HistoryHandle, HistoryStore};
use crate::core::persona::PersonaStore;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::ui::chat_loop::{run_chat, Startup};
use crate::ui::theme::Theme;
use crate::utils::logging::{default_log_path, init_tracing};
use crate::utils::path::expand_tilde;

#[derive(Parser, Debug)]
#[command(name = "geminiweb")]
#[command(version)]
#[command(about = "A terminal chat client for Gemini web sessions")]
#[command(
    long_about = "geminiweb is a full-screen terminal chat client for Gemini. It keeps \
conversation history on disk, switches gems and personas, exports transcripts, \
downloads generated images, and lets the model call local tools with your approval.\n\n\
Controls:\n\
  Enter             Send the message\n\
  Ctrl+G            Pick a gem\n\
  Ctrl+E            Export the conversation\n\
  Esc               Cancel a pending request\n\
  PgUp/PgDn         Scroll the transcript\n\
  Ctrl+C            Quit\n\n\
Commands:\n\
  /help             List every slash command"
)]
pub struct Args {
    /// Message to send as soon as the session starts
    pub prompt: Option<String>,

    /// Model to use for this session
    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Persona to activate at startup
    #[arg(long, value_name = "NAME")]
    pub persona: Option<String>,

    /// Run tools that need confirmation without asking
    #[arg(long)]
    pub auto_approve: bool,

    /// Do not read or write conversation history
    #[arg(long)]
    pub no_history: bool,

    /// Reopen a saved conversation by id
    #[arg(long, value_name = "ID")]
    pub resume: Option<String>,

    /// Config file to use instead of ~/.geminiweb/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Write diagnostics here instead of ~/.geminiweb/geminiweb.log
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,
}

impl Args {
    fn config_path(&self) -> PathBuf {
        self.config
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(Config::default_path)
    }

    fn log_path(&self) -> PathBuf {
        self.log_file
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(default_log_path)
    }
}

/// Flags win over the config file.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(model) = args.model.as_ref().filter(|m| !m.trim().is_empty()) {
        config.default_model = Some(model.clone());
    }
    if let Some(persona) = &args.persona {
        config.persona = Some(persona.clone());
    }
    if args.auto_approve {
        config.auto_approve_tools = Some(true);
    }
}

fn open_history(config: &Config, args: &Args) -> Option<HistoryHandle> {
    if args.no_history {
        return None;
    }
    let dir = config.history_dir();
    match FileHistoryStore::open(&dir) {
        Ok(store) => {
            let store: Arc<dyn HistoryStore> = Arc::new(store);
            Some(HistoryHandle::probe(store))
        }
        Err(err) => {
            warn!(error = %err, dir = %dir.display(), "History disabled");
            None
        }
    }
}

fn load_personas(config: &Config) -> Result<PersonaStore, Box<dyn Error>> {
    let mut personas = PersonaStore::load(config);
    if let Some(name) = config.persona.as_deref().filter(|n| !n.is_empty()) {
        personas.activate(name)?;
    }
    Ok(personas)
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load_from_path(&args.config_path())?;
    apply_overrides(&mut config, &args);

    init_tracing(&args.log_path())?;
    info!(model = %config.model(), "Starting geminiweb");

    let client = WebClient::new(RemoteSettings {
        base_url: config.base_url(),
        token: config.token(),
        timeout: config.remote_timeout(),
        default_model: config.model(),
    })?;
    let remote: Arc<dyn RemoteClient> = Arc::new(client);
    let chat = remote.start_chat().await?;

    let registry = Arc::new(if config.tools_enabled() {
        ToolRegistry::builtin()
    } else {
        ToolRegistry::new()
    });
    let executor = ToolExecutor::new(
        registry.clone(),
        config.tool_timeout(),
        config.tool_output_limit(),
    );

    let app = App::new(AppInit {
        chat,
        history: open_history(&config, &args),
        tools: registry,
        personas: load_personas(&config)?,
        theme: Theme::from_name(config.theme.as_deref()),
        markdown: config.markdown_enabled(),
        auto_approve: config.auto_approve(),
        download_dir: config.download_dir(),
    });

    run_chat(
        app,
        remote,
        executor,
        Startup {
            initial_prompt: args.prompt.filter(|p| !p.trim().is_empty()),
            resume: args.resume,
        },
    )
    .await
}

pub fn main() -> ExitCode {
    let args = Args::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("❌ Error: cannot start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(async_main(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ Error: {err}");
            ExitCode::FAILURE
        }
    }
}
